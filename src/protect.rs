//! Protected `<text>` fragments.
//!
//! Label elements carry hand-tuned whitespace and inline markup that neither
//! the stages nor the pretty printer may touch. Before the pipeline runs each
//! `<text>…</text>` block is swapped for a numbered comment placeholder, and
//! after pretty-printing the placeholders are replaced by the original bytes.

use once_cell::sync::Lazy;
use regex::Regex;

// Opening tag may not end in `/>`: a self-closing <text/> has no body to protect.
static RE_TEXT_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<text(?:\s(?:[^>]*[^/>])?)?>.*?</text\s*>").unwrap()
});

/// Ordered registry of extracted fragments. Index `n` is restored from the
/// placeholder returned by [`ProtectedText::placeholder`]`(n)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedText {
    fragments: Vec<String>,
}

impl ProtectedText {
    /// Replace every text block in `svg` with a placeholder.
    pub fn extract(svg: &str) -> (String, Self) {
        let mut fragments = Vec::new();
        let masked = RE_TEXT_BLOCK
            .replace_all(svg, |caps: &regex::Captures<'_>| {
                let placeholder = Self::placeholder(fragments.len());
                fragments.push(caps[0].to_string());
                placeholder
            })
            .into_owned();
        (masked, Self { fragments })
    }

    /// Placeholder text for fragment `index`.
    pub fn placeholder(index: usize) -> String {
        format!("<!--__TEXT_BLOCK_{index}__-->")
    }

    /// Splice every fragment back in place of its placeholder.
    pub fn restore(&self, svg: &str) -> String {
        let mut out = svg.to_string();
        for (i, fragment) in self.fragments.iter().enumerate() {
            out = out.replace(&Self::placeholder(i), fragment);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_in_order() {
        let svg = "<svg><text x=\"1\">A</text><g/><TEXT>\n  B <tspan>b</tspan>\n</TEXT></svg>";
        let (masked, registry) = ProtectedText::extract(svg);
        assert_eq!(
            masked,
            "<svg><!--__TEXT_BLOCK_0__--><g/><!--__TEXT_BLOCK_1__--></svg>"
        );
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.fragments()[0], "<text x=\"1\">A</text>");
        assert_eq!(registry.restore(&masked), svg);
    }

    #[test]
    fn ignores_textpath_and_self_closing() {
        let svg = "<svg><textPath>a</textPath><text/><path/></svg>";
        let (masked, registry) = ProtectedText::extract(svg);
        assert!(registry.is_empty());
        assert_eq!(masked, svg);
    }

    #[test]
    fn non_greedy_per_block() {
        let svg = "<text>a</text><g/><text>b</text>";
        let (masked, registry) = ProtectedText::extract(svg);
        assert_eq!(registry.len(), 2);
        assert!(masked.contains("<g/>"));
    }

    #[test]
    fn restore_survives_reindent() {
        let (masked, registry) = ProtectedText::extract("<svg><text>  keep   me </text></svg>");
        let reindented = masked.replace("<svg>", "<svg>\n  ").replace("</svg>", "\n</svg>\n");
        let restored = registry.restore(&reindented);
        assert!(restored.contains("<text>  keep   me </text>"));
    }
}
