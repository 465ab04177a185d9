//! Stages 6–8: attribute hygiene.
//!
//! - [`RemoveDebugAttributes`] drops geo-debug attributes (`data-geo*`) from
//!   drawable elements.
//! - [`RemoveLegacyAttribute`] drops the legacy stroke width marker from every
//!   element.
//! - [`UppercaseCodes`] trims and uppercases every code attribute value.

use super::{edit_all_tags, edit_attr_run, edit_drawable_tags, is_drawable, rewrite, AttrEdit, Stage};
use crate::error::StageError;
use crate::tree::{local_name, XmlDocument};
use quick_xml::escape::{escape, unescape};
use std::borrow::Cow;
use tracing::debug;

// ── Debug attributes ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RemoveDebugAttributes {
    /// Lowercased attribute-name prefix.
    prefix: String,
}

impl RemoveDebugAttributes {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_ascii_lowercase(),
        }
    }

    fn matches(&self, name: &str) -> bool {
        local_name(name).to_ascii_lowercase().starts_with(&self.prefix)
    }
}

impl Stage for RemoveDebugAttributes {
    fn name(&self) -> &'static str {
        "remove_debug_attributes"
    }

    fn apply(&self, svg: &str) -> Result<String, StageError> {
        rewrite(
            self.name(),
            svg,
            |doc| {
                let mut removed = 0;
                doc.root.for_each_element_mut(&mut |el| {
                    if is_drawable(el) {
                        removed += el.remove_attrs(|n| self.matches(n));
                    }
                });
                debug!("Removed {} {}* attribute(s)", removed, self.prefix);
            },
            |text| {
                edit_drawable_tags(text, |attrs| {
                    edit_attr_run(attrs, |name, _| {
                        if self.matches(name) {
                            AttrEdit::Drop
                        } else {
                            AttrEdit::Keep
                        }
                    })
                })
            },
        )
    }
}

// ── Legacy stroke width ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RemoveLegacyAttribute {
    attribute: String,
}

impl RemoveLegacyAttribute {
    pub fn new(attribute: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
        }
    }

    fn matches(&self, name: &str) -> bool {
        local_name(name).eq_ignore_ascii_case(&self.attribute)
    }
}

impl Stage for RemoveLegacyAttribute {
    fn name(&self) -> &'static str {
        "remove_legacy_stroke_width"
    }

    fn apply(&self, svg: &str) -> Result<String, StageError> {
        rewrite(
            self.name(),
            svg,
            |doc| {
                doc.root.for_each_element_mut(&mut |el| {
                    el.remove_attrs(|n| self.matches(n));
                });
            },
            |text| {
                edit_all_tags(text, |attrs| {
                    edit_attr_run(attrs, |name, _| {
                        if self.matches(name) {
                            AttrEdit::Drop
                        } else {
                            AttrEdit::Keep
                        }
                    })
                })
            },
        )
    }
}

// ── Code casing ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct UppercaseCodes {
    attribute: String,
}

impl UppercaseCodes {
    pub fn new(attribute: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
        }
    }

    fn matches(&self, name: &str) -> bool {
        local_name(name).eq_ignore_ascii_case(&self.attribute)
    }

    fn on_tree(&self, doc: &mut XmlDocument) {
        doc.root.for_each_element_mut(&mut |el| {
            for attr in el.attributes.iter_mut().filter(|a| self.matches(&a.name)) {
                if let Some(upper) = uppercase_raw(&attr.value) {
                    attr.value = upper;
                }
            }
        });
    }
}

/// Trimmed, uppercased form of a raw attribute value, or `None` when it is
/// already normalised.
fn uppercase_raw(raw: &str) -> Option<String> {
    let text = unescape(raw).unwrap_or(Cow::Borrowed(raw));
    let upper = text.trim().to_uppercase();
    if upper == text {
        return None;
    }
    Some(escape(upper.as_str()).into_owned())
}

impl Stage for UppercaseCodes {
    fn name(&self) -> &'static str {
        "uppercase_iso_codes"
    }

    fn apply(&self, svg: &str) -> Result<String, StageError> {
        rewrite(
            self.name(),
            svg,
            |doc| self.on_tree(doc),
            |text| {
                edit_all_tags(text, |attrs| {
                    edit_attr_run(attrs, |name, value| match uppercase_raw(value) {
                        Some(upper) if self.matches(name) => AttrEdit::Set(upper),
                        _ => AttrEdit::Keep,
                    })
                })
            },
        )
    }
}
