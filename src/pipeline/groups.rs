//! Stage 10: remove `<g>` elements with no content.
//!
//! Removal is bottom-up, so a group that only contained empty groups goes as
//! well. The root element is never removed.

use super::{rewrite, Stage};
use crate::error::StageError;
use crate::tree::{Element, Node, XmlDocument};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static RE_EMPTY_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<(?:[A-Za-z_][-\w.]*:)?g(\s[^>]*)?>\s*</(?:[A-Za-z_][-\w.]*:)?g\s*>").unwrap()
});
static RE_EMPTY_SELF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(?:[A-Za-z_][-\w.]*:)?g(?:\s[^>]*)?/>").unwrap());

#[derive(Debug, Default)]
pub struct RemoveEmptyGroups;

impl Stage for RemoveEmptyGroups {
    fn name(&self) -> &'static str {
        "remove_empty_groups"
    }

    fn apply(&self, svg: &str) -> Result<String, StageError> {
        rewrite(self.name(), svg, prune_tree, prune_text)
    }
}

fn prune(el: &mut Element) -> usize {
    let mut removed = 0;
    for child in &mut el.children {
        if let Node::Element(e) = child {
            removed += prune(e);
        }
    }
    let before = el.children.len();
    el.children
        .retain(|n| !matches!(n, Node::Element(e) if e.is("g") && e.is_blank()));
    removed + before - el.children.len()
}

fn prune_tree(doc: &mut XmlDocument) {
    let removed = prune(&mut doc.root);
    if removed > 0 {
        debug!("Removed {} empty group(s)", removed);
    }
}

/// Repeat until stable so groups emptied by an inner removal go too.
fn prune_text(svg: &str) -> String {
    let mut current = svg.to_string();
    loop {
        let next = RE_EMPTY_SELF.replace_all(&current, "");
        let next = RE_EMPTY_PAIR
            .replace_all(&next, |caps: &regex::Captures<'_>| {
                let self_closing = caps.get(1).is_some_and(|a| a.as_str().ends_with('/'));
                if self_closing {
                    caps[0].to_string()
                } else {
                    String::new()
                }
            })
            .into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(svg: &str) -> String {
        RemoveEmptyGroups.apply(svg).unwrap()
    }

    #[test]
    fn removes_nested_empty_groups() {
        assert_eq!(
            run("<svg><g id=\"outer\"><g>\n  </g><g/></g><g><path d=\"M0\"/></g></svg>"),
            "<svg><g><path d=\"M0\" /></g></svg>"
        );
    }

    #[test]
    fn keeps_groups_with_comments_or_text() {
        let svg = "<svg><g><!--__TEXT_BLOCK_0__--></g><g>x</g></svg>";
        assert_eq!(run(svg), svg);
    }

    #[test]
    fn root_group_survives() {
        assert_eq!(run("<g><g/></g>"), "<g></g>");
    }

    #[test]
    fn text_fallback_is_bottom_up() {
        assert_eq!(
            prune_text("<svg><g a=\"1\"><g> </g><G/></g><g><path/></g>"),
            "<svg><g><path/></g>"
        );
    }
}
