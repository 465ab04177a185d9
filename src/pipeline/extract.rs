//! Stage 1: unwrap a root element nested inside a same-named root.
//!
//! Some exports wrap the real map in an outer `<svg>`. When a second `<svg>`
//! exists the document is cut down to that element's subtree; otherwise it
//! is returned unchanged.

use super::{rewrite, Stage};
use crate::error::StageError;
use crate::tree::XmlDocument;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_SVG_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</?svg\b").unwrap());

#[derive(Debug, Default)]
pub struct ExtractInnerSvg;

impl Stage for ExtractInnerSvg {
    fn name(&self) -> &'static str {
        "extract_inner_svg"
    }

    fn apply(&self, svg: &str) -> Result<String, StageError> {
        rewrite(self.name(), svg, extract_tree, extract_text)
    }
}

fn extract_tree(doc: &mut XmlDocument) {
    let root_name = doc.root.local_name().to_string();
    if let Some(inner) = doc.root.find_descendant(&|e| e.is(&root_name)) {
        *doc = XmlDocument::from_root(inner.clone());
    }
}

/// Depth-tracked scan from the second `<svg` to its matching close.
fn extract_text(svg: &str) -> String {
    let mut tags = RE_SVG_TAG.find_iter(svg).filter(|m| !m.as_str().starts_with("</"));
    let (Some(_outer), Some(inner)) = (tags.next(), tags.next()) else {
        return svg.to_string();
    };

    let mut depth = 0usize;
    for m in RE_SVG_TAG.find_iter(&svg[inner.start()..]) {
        let at = inner.start() + m.start();
        let Some(gt) = svg[at..].find('>').map(|i| at + i) else {
            return svg.to_string();
        };
        if m.as_str().starts_with("</") {
            depth = depth.saturating_sub(1);
        } else if !svg[..gt].ends_with('/') {
            depth += 1;
        }
        if depth == 0 {
            return svg[inner.start()..=gt].to_string();
        }
    }
    svg.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(svg: &str) -> String {
        ExtractInnerSvg.apply(svg).unwrap()
    }

    #[test]
    fn extracts_nested_root() {
        assert_eq!(
            run("<svg><svg width=\"10\"><path id=\"FR\"></path></svg></svg>"),
            "<svg width=\"10\"><path id=\"FR\"></path></svg>"
        );
    }

    #[test]
    fn single_root_unchanged() {
        let svg = "<svg viewBox=\"0 0 1 1\">\n  <g><path d=\"M0\"/></g>\n</svg>";
        assert_eq!(run(svg), svg);
    }

    #[test]
    fn nested_inside_group_is_found() {
        assert_eq!(
            run("<svg><g><svg id=\"map\"><svg id=\"icon\"/></svg></g></svg>"),
            "<svg id=\"map\"><svg id=\"icon\" /></svg>"
        );
    }

    #[test]
    fn namespaced_roots_match_by_local_name() {
        assert_eq!(
            run("<svg:svg xmlns:svg=\"u\"><svg:svg id=\"in\"></svg:svg></svg:svg>"),
            "<svg:svg id=\"in\"></svg:svg>"
        );
    }

    #[test]
    fn text_fallback_tracks_depth() {
        // unparseable because of the trailing junk; fallback still cuts correctly
        let svg = "<svg><svg id=\"a\"><svg id=\"b\"></svg><g></g></svg></svg>junk<";
        assert_eq!(
            extract_text(svg),
            "<svg id=\"a\"><svg id=\"b\"></svg><g></g></svg>"
        );
    }

    #[test]
    fn text_fallback_self_closing_inner() {
        assert_eq!(extract_text("<svg><svg id=\"a\"/></svg"), "<svg id=\"a\"/>");
    }

    #[test]
    fn text_fallback_single_root() {
        assert_eq!(extract_text("<svg><g></svg"), "<svg><g></svg");
    }
}
