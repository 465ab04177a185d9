//! Stage 4: remove `<defs>` blocks with everything inside them.

use super::{rewrite, Stage};
use crate::error::StageError;
use crate::tree::XmlDocument;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static RE_DEFS_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<defs\b[^>]*[^/>]>.*?</defs\s*>|<defs>.*?</defs\s*>").unwrap());
static RE_DEFS_EMPTY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<defs\b[^>]*/>").unwrap());

#[derive(Debug, Default)]
pub struct RemoveDefs;

impl Stage for RemoveDefs {
    fn name(&self) -> &'static str {
        "remove_defs"
    }

    fn apply(&self, svg: &str) -> Result<String, StageError> {
        rewrite(self.name(), svg, remove_tree, remove_text)
    }
}

fn remove_tree(doc: &mut XmlDocument) {
    let removed = doc.root.remove_descendants(&|e| e.is("defs"));
    if removed > 0 {
        debug!("Removed {} <defs> block(s)", removed);
    }
}

fn remove_text(svg: &str) -> String {
    let s = RE_DEFS_BLOCK.replace_all(svg, "");
    RE_DEFS_EMPTY.replace_all(&s, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_nested_content() {
        let svg = "<svg><DEFS id=\"d\"><clipPath><path/></clipPath></DEFS><path id=\"a\"/><defs/></svg>";
        assert_eq!(RemoveDefs.apply(svg).unwrap(), "<svg><path id=\"a\" /></svg>");
    }

    #[test]
    fn each_block_removed_separately() {
        let svg = "<svg><defs><g/></defs><path id=\"keep\"/><defs><g/></defs></svg>";
        let out = RemoveDefs.apply(svg).unwrap();
        assert!(out.contains("keep"));
        assert!(!out.to_lowercase().contains("defs"));
    }

    #[test]
    fn text_fallback_non_greedy() {
        assert_eq!(
            remove_text("<svg><defs><g/></defs><path id=\"keep\"/><defs x=\"1\"></defs><defs/><g>"),
            "<svg><path id=\"keep\"/><g>"
        );
    }
}
