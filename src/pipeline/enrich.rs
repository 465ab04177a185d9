//! Stage 5: infer a country code for each drawable element.
//!
//! The candidate name is taken from the first non-empty of `id`, `name`,
//! `data-name`, falling back to the text of a direct `<title>` child. It is
//! resolved through the [`IsoTable`]; on a hit the code attribute is added.
//! Elements that already carry the code attribute are never touched.

use super::{edit_drawable_tags, find_attr, is_drawable, rewrite, Stage};
use crate::error::StageError;
use crate::iso::IsoTable;
use crate::tree::{Element, XmlDocument};
use once_cell::sync::Lazy;
use quick_xml::escape::{escape, unescape};
use regex::Regex;
use std::borrow::Cow;
use tracing::debug;

const NAME_ATTRS: [&str; 3] = ["id", "name", "data-name"];

static RE_PAIRED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)(<(?:[A-Za-z_][-\w.]*:)?(?:path|g)\b)((?:[^>]*[^/>])?)>(.*?)(</(?:[A-Za-z_][-\w.]*:)?(?:path|g)\s*>)",
    )
    .unwrap()
});
static RE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(?:[A-Za-z_][-\w.]*:)?title(?:\s[^>]*)?>(.*?)</").unwrap());

pub struct AddIsoCodes {
    table: Option<IsoTable>,
    attribute: String,
}

impl AddIsoCodes {
    pub fn new(table: Option<IsoTable>, attribute: &str) -> Self {
        Self {
            table,
            attribute: attribute.to_string(),
        }
    }

    fn on_tree(&self, table: &IsoTable, doc: &mut XmlDocument) {
        let mut added = 0usize;
        doc.root.for_each_element_mut(&mut |el| {
            if !is_drawable(el) || el.has_attr(&self.attribute) {
                return;
            }
            let Some(candidate) = candidate_name(el) else {
                return;
            };
            if let Some(code) = table.resolve(&candidate) {
                el.push_attr(self.attribute.clone(), code);
                added += 1;
            }
        });
        debug!("Added {} to {} element(s)", self.attribute, added);
    }

    /// Code for an opening tag's attribute run, or `None` when it already has
    /// one or nothing resolves.
    fn code_for_tag(&self, table: &IsoTable, attrs: &str, body: Option<&str>) -> Option<String> {
        if find_attr(attrs, &self.attribute).is_some() {
            return None;
        }
        let from_attrs = NAME_ATTRS
            .iter()
            .filter_map(|name| find_attr(attrs, name))
            .map(|raw| unescape(raw).unwrap_or(Cow::Borrowed(raw)))
            .find(|v| !v.trim().is_empty());
        let candidate = match from_attrs {
            Some(c) => c.into_owned(),
            None => {
                let title = RE_TITLE.captures(body?)?.get(1)?.as_str();
                unescape(title).map(Cow::into_owned).unwrap_or_else(|_| title.to_string())
            }
        };
        table.resolve(&candidate).map(str::to_owned)
    }

    fn with_code(&self, attrs: &str, code: &str) -> String {
        format!("{} {}=\"{}\"", attrs.trim_end(), self.attribute, escape(code))
    }

    fn on_text(&self, table: &IsoTable, svg: &str) -> String {
        let paired = RE_PAIRED
            .replace_all(svg, |caps: &regex::Captures<'_>| {
                match self.code_for_tag(table, &caps[2], Some(&caps[3])) {
                    Some(code) => format!(
                        "{}{}>{}{}",
                        &caps[1],
                        self.with_code(&caps[2], &code),
                        &caps[3],
                        &caps[4]
                    ),
                    None => caps[0].to_string(),
                }
            })
            .into_owned();

        // self-closing tags, plus any opening tag the paired pass left alone
        edit_drawable_tags(&paired, |attrs| {
            let code = self.code_for_tag(table, attrs, None)?;
            Some(self.with_code(attrs, &code))
        })
    }
}

/// First non-empty naming attribute, then a direct `<title>` child's text.
fn candidate_name(el: &Element) -> Option<String> {
    NAME_ATTRS
        .iter()
        .filter_map(|name| el.attr_text(name))
        .find(|v| !v.trim().is_empty())
        .map(Cow::into_owned)
        .or_else(|| {
            el.child_elements()
                .find(|c| c.is("title"))
                .map(Element::text)
                .filter(|t| !t.trim().is_empty())
        })
}

impl Stage for AddIsoCodes {
    fn name(&self) -> &'static str {
        "add_iso_codes"
    }

    fn apply(&self, svg: &str) -> Result<String, StageError> {
        let Some(table) = self.table.as_ref() else {
            return Ok(svg.to_string());
        };
        rewrite(
            self.name(),
            svg,
            |doc| self.on_tree(table, doc),
            |text| self.on_text(table, text),
        )
    }
}
