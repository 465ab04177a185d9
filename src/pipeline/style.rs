//! Stage 9: strip visual styling from drawable elements so the map can be
//! themed from CSS.
//!
//! `fill`, `stroke` and `stroke-width` attributes are removed, and the same
//! properties plus `filter` are dropped from inline `style`. A `style` left
//! with no declarations is removed entirely. Unrelated declarations keep
//! their order.

use super::{edit_attr_run, edit_drawable_tags, is_drawable, rewrite, AttrEdit, Stage};
use crate::error::StageError;
use crate::tree::{local_name, Element, XmlDocument};

const PAINT_ATTRS: [&str; 3] = ["fill", "stroke", "stroke-width"];
const STYLE_PROPS: [&str; 4] = ["fill", "stroke", "filter", "stroke-width"];

#[derive(Debug, Default)]
pub struct StripVisualStyling;

impl Stage for StripVisualStyling {
    fn name(&self) -> &'static str {
        "strip_visual_styling"
    }

    fn apply(&self, svg: &str) -> Result<String, StageError> {
        rewrite(self.name(), svg, strip_tree, strip_text)
    }
}

fn is_paint_attr(name: &str) -> bool {
    let local = local_name(name);
    PAINT_ATTRS.iter().any(|p| local.eq_ignore_ascii_case(p))
}

/// Drop visual declarations from a style value. `None` when nothing was
/// removed; otherwise the remaining declarations joined with `;` (possibly
/// empty).
pub fn strip_style(style: &str) -> Option<String> {
    let decls: Vec<&str> = style.split(';').map(str::trim).filter(|d| !d.is_empty()).collect();
    let keep: Vec<&str> = decls
        .iter()
        .copied()
        .filter(|d| {
            let prop = d.split(':').next().unwrap_or_default().trim();
            !STYLE_PROPS.iter().any(|p| prop.eq_ignore_ascii_case(p))
        })
        .collect();
    (keep.len() != decls.len()).then(|| keep.join(";"))
}

fn strip_element(el: &mut Element) {
    el.remove_attrs(is_paint_attr);
    let mut empty_style = false;
    for attr in el.attributes.iter_mut().filter(|a| local_name(&a.name).eq_ignore_ascii_case("style")) {
        if let Some(kept) = strip_style(&attr.value) {
            empty_style |= kept.is_empty();
            attr.value = kept;
        }
    }
    if empty_style {
        el.remove_attrs(|n| local_name(n).eq_ignore_ascii_case("style"));
    }
}

fn strip_tree(doc: &mut XmlDocument) {
    doc.root.for_each_element_mut(&mut |el| {
        if is_drawable(el) {
            strip_element(el);
        }
    });
}

fn strip_text(svg: &str) -> String {
    edit_drawable_tags(svg, |attrs| {
        edit_attr_run(attrs, |name, value| {
            if is_paint_attr(name) {
                return AttrEdit::Drop;
            }
            if !local_name(name).eq_ignore_ascii_case("style") {
                return AttrEdit::Keep;
            }
            match strip_style(value) {
                Some(kept) if kept.is_empty() => AttrEdit::Drop,
                Some(kept) => AttrEdit::Set(kept),
                None => AttrEdit::Keep,
            }
        })
    })
}
