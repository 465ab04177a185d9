//! Stage 2: force the root's presentation attributes.
//!
//! Existing `fill`, `stroke` and `stroke-width` on the root opening tag are
//! dropped and the configured values appended; every other attribute is
//! left exactly as it was.

use super::{rewrite, Stage};
use crate::config::RootPaint;
use crate::error::StageError;
use crate::tree::{local_name, XmlDocument};
use once_cell::sync::Lazy;
use regex::Regex;

const PAINT_ATTRS: [&str; 3] = ["fill", "stroke", "stroke-width"];

static RE_ROOT_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)(<svg\b)([^>]*?)(/?>)").unwrap());
static RE_PAINT_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\s(?:fill|stroke|stroke-width)\s*=\s*(?:"[^"]*"|'[^']*')"#).unwrap()
});

#[derive(Debug, Clone, Default)]
pub struct SetRootPaint {
    paint: RootPaint,
}

impl SetRootPaint {
    pub fn new(paint: RootPaint) -> Self {
        Self { paint }
    }

    fn values(&self) -> [(&'static str, &str); 3] {
        [
            ("fill", self.paint.fill.as_str()),
            ("stroke", self.paint.stroke.as_str()),
            ("stroke-width", self.paint.stroke_width.as_str()),
        ]
    }

    fn on_tree(&self, doc: &mut XmlDocument) {
        let root = &mut doc.root;
        root.remove_attrs(|name| PAINT_ATTRS.iter().any(|p| local_name(name).eq_ignore_ascii_case(p)));
        for (name, value) in self.values() {
            root.push_attr(name, value);
        }
    }

    fn on_text(&self, svg: &str) -> String {
        RE_ROOT_TAG
            .replacen(svg, 1, |caps: &regex::Captures<'_>| {
                let attrs = RE_PAINT_ATTR.replace_all(&caps[2], "");
                let attrs = attrs.split_whitespace().collect::<Vec<_>>().join(" ");
                let mut tag = caps[1].to_string();
                if !attrs.is_empty() {
                    tag.push(' ');
                    tag.push_str(&attrs);
                }
                for (name, value) in self.values() {
                    tag.push_str(&format!(" {name}=\"{value}\""));
                }
                tag.push_str(&caps[3]);
                tag
            })
            .into_owned()
    }
}

impl Stage for SetRootPaint {
    fn name(&self) -> &'static str {
        "set_root_paint"
    }

    fn apply(&self, svg: &str) -> Result<String, StageError> {
        rewrite(self.name(), svg, |doc| self.on_tree(doc), |text| self.on_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> SetRootPaint {
        SetRootPaint::new(RootPaint::default())
    }

    #[test]
    fn appends_paint_to_bare_root() {
        assert_eq!(
            stage().apply("<svg width=\"10\"><path/></svg>").unwrap(),
            "<svg width=\"10\" fill=\"#fff\" stroke=\"#000\" stroke-width=\"0.2\"><path /></svg>"
        );
    }

    #[test]
    fn replaces_existing_paint_keeps_others() {
        let out = stage()
            .apply("<svg fill=\"red\" id=\"m\" STROKE=\"blue\" stroke-width=\"3\" viewBox=\"0 0 1 1\"/>")
            .unwrap();
        assert_eq!(
            out,
            "<svg id=\"m\" viewBox=\"0 0 1 1\" fill=\"#fff\" stroke=\"#000\" stroke-width=\"0.2\" />"
        );
    }

    #[test]
    fn only_root_is_touched() {
        let out = stage().apply("<svg><svg fill=\"red\"/></svg>").unwrap();
        assert!(out.contains("<svg fill=\"red\" />"), "got: {out}");
    }

    #[test]
    fn idempotent() {
        let once = stage().apply("<svg fill=\"red\"><g/></svg>").unwrap();
        assert_eq!(stage().apply(&once).unwrap(), once);
    }

    #[test]
    fn text_fallback_first_tag_only() {
        let out = stage().on_text("<svg  fill=\"red\"   id=\"x\"><svg fill=\"blue\"><g>");
        assert_eq!(
            out,
            "<svg id=\"x\" fill=\"#fff\" stroke=\"#000\" stroke-width=\"0.2\"><svg fill=\"blue\"><g>"
        );
    }
}
