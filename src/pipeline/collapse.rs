//! Stage 3: collapse empty paired tags into self-closing ones.

use super::{rewrite, Stage};
use crate::error::StageError;
use crate::tree::XmlDocument;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_EMPTY_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<([A-Za-z_][-\w:.]*)([^>]*)>\s*</([A-Za-z_][-\w:.]*)\s*>").unwrap()
});

#[derive(Debug, Default)]
pub struct CollapseEmptyElements;

impl Stage for CollapseEmptyElements {
    fn name(&self) -> &'static str {
        "collapse_empty_elements"
    }

    fn apply(&self, svg: &str) -> Result<String, StageError> {
        rewrite(self.name(), svg, collapse_tree, collapse_text)
    }
}

fn collapse_tree(doc: &mut XmlDocument) {
    doc.root.for_each_element_mut(&mut |el| {
        if el.is_blank() {
            el.children.clear();
            el.self_closing = true;
        }
    });
}

fn collapse_text(svg: &str) -> String {
    RE_EMPTY_PAIR
        .replace_all(svg, |caps: &regex::Captures<'_>| {
            let attrs = &caps[2];
            if caps[1] != caps[3] || attrs.ends_with('/') {
                return caps[0].to_string();
            }
            format!("<{}{} />", &caps[1], attrs.trim_end())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_only_body() {
        assert_eq!(
            CollapseEmptyElements
                .apply("<svg><path id=\"FR\" d=\"M0\">\n   </path><g></g></svg>")
                .unwrap(),
            "<svg><path id=\"FR\" d=\"M0\" /><g /></svg>"
        );
    }

    #[test]
    fn keeps_bodies_with_content() {
        let svg = "<svg><path><title>France</title></path><g><!--__TEXT_BLOCK_0__--></g></svg>";
        assert_eq!(CollapseEmptyElements.apply(svg).unwrap(), svg);
    }

    #[test]
    fn text_fallback_requires_matching_names() {
        assert_eq!(
            collapse_text("<path d=\"M0\">  </path><a></b><g/></g>"),
            "<path d=\"M0\" /><a></b><g/></g>"
        );
    }
}
