//! Final formatting pass.
//!
//! One node per line, children indented by the configured unit. Childless
//! elements print as `<name attrs/>` and an element whose only child is text
//! prints inline. The XML declaration and whitespace-only text are dropped,
//! and the output ends with a single newline. Printing already-pretty output
//! again yields the same bytes.

use crate::tree::{Element, Node, XmlDocument, XmlError};

/// Re-indent `svg`. Fails only if `svg` is not well-formed.
pub fn pretty_print(svg: &str, indent: &str) -> Result<String, XmlError> {
    let mut doc = XmlDocument::parse(svg)?;
    doc.strip_blank_text();

    let mut printer = Printer {
        out: String::with_capacity(svg.len() + svg.len() / 4),
        indent,
    };
    for node in &doc.prolog {
        printer.node(node, 0);
    }
    printer.element(&doc.root, 0);
    for node in &doc.epilog {
        printer.node(node, 0);
    }
    Ok(printer.out)
}

struct Printer<'a> {
    out: String,
    indent: &'a str,
}

impl Printer<'_> {
    fn line_start(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str(self.indent);
        }
    }

    fn node(&mut self, node: &Node, depth: usize) {
        match node {
            Node::Element(e) => self.element(e, depth),
            Node::Declaration(_) => {}
            Node::Text(t) => {
                let t = t.trim();
                if !t.is_empty() {
                    self.line_start(depth);
                    self.out.push_str(t);
                    self.out.push('\n');
                }
            }
            other => {
                self.line_start(depth);
                self.out.push_str(other.raw().unwrap_or_default());
                self.out.push('\n');
            }
        }
    }

    fn element(&mut self, el: &Element, depth: usize) {
        self.line_start(depth);
        match el.children.as_slice() {
            [] => el.write_open_tag(&mut self.out, "/>"),
            [Node::Text(text)] => {
                el.write_open_tag(&mut self.out, ">");
                self.out.push_str(text);
                self.close(el);
            }
            children => {
                el.write_open_tag(&mut self.out, ">");
                self.out.push('\n');
                for child in children {
                    self.node(child, depth + 1);
                }
                self.line_start(depth);
                self.close(el);
            }
        }
        self.out.push('\n');
    }

    fn close(&mut self, el: &Element) {
        self.out.push_str("</");
        self.out.push_str(&el.name);
        self.out.push('>');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indents_and_closes_childless() {
        let out = pretty_print(
            "<?xml version=\"1.0\"?><svg a=\"1\"><g><path d=\"M0\" /></g><title>France</title></svg>",
            "  ",
        )
        .unwrap();
        assert_eq!(
            out,
            "<svg a=\"1\">\n  <g>\n    <path d=\"M0\"/>\n  </g>\n  <title>France</title>\n</svg>\n"
        );
    }

    #[test]
    fn blank_text_dropped() {
        let out = pretty_print("<svg>\n\n\n   <g>\n\n</g>\n\n</svg>", "  ").unwrap();
        assert_eq!(out, "<svg>\n  <g/>\n</svg>\n");
    }

    #[test]
    fn comments_on_their_own_line() {
        let out = pretty_print("<svg><g><!--__TEXT_BLOCK_0__--></g></svg>", "\t").unwrap();
        assert_eq!(out, "<svg>\n\t<g>\n\t\t<!--__TEXT_BLOCK_0__-->\n\t</g>\n</svg>\n");
    }

    #[test]
    fn mixed_content_text_trimmed() {
        let out = pretty_print("<svg><g> a <b/> c </g></svg>", "  ").unwrap();
        assert_eq!(out, "<svg>\n  <g>\n    a\n    <b/>\n    c\n  </g>\n</svg>\n");
    }

    #[test]
    fn idempotent() {
        let input = "<svg x=\"&amp;\"><g id=\"a\"><title> T </title><path/>text<!--c--></g></svg>";
        let once = pretty_print(input, "  ").unwrap();
        assert_eq!(pretty_print(&once, "  ").unwrap(), once);
        assert!(once.ends_with("</svg>\n") && !once.ends_with("\n\n"));
    }

    #[test]
    fn malformed_is_error() {
        assert!(pretty_print("<svg><g></svg>", "  ").is_err());
    }
}
