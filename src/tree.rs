//! Owned XML tree used by the structural stages and the pretty printer.
//!
//! ## Why not a full DOM crate?
//!
//! The stages only ever need three things: walk elements, match tag and
//! attribute names without caring about namespace prefixes, and write the
//! document back out *without disturbing anything they did not touch*. The
//! tree therefore stores text and attribute values exactly as they appear in
//! the source (still escaped), so a parse → serialise cycle leaves content
//! byte-identical apart from whitespace between attributes.
//!
//! Parsing is event-based via [`quick_xml`]. On top of what the reader checks
//! we enforce the well-formedness rules the validation gate relies on: one
//! root, balanced tags, no stray text outside the root, known entities only
//! (predefined, numeric, or declared in the internal DTD subset), and no
//! namespace prefix without an `xmlns:*` declaration in scope. Prefix
//! resolution comes from [`quick_xml::NsReader`].

use once_cell::sync::Lazy;
use quick_xml::escape::{resolve_predefined_entity, unescape, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use thiserror::Error;

/// Well-formedness failure, with the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at byte {position}")]
pub struct XmlError {
    pub position: usize,
    pub message: String,
}

impl XmlError {
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// A parsed document: whatever precedes the root, the root, whatever follows.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub prolog: Vec<Node>,
    pub root: Element,
    pub epilog: Vec<Node>,
}

/// One node of the tree. Every non-element variant holds raw source text.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Character data, escaped as in the source (entity references inline).
    Text(String),
    /// `<![CDATA[...]]>` including delimiters.
    CData(String),
    /// `<!--...-->` including delimiters.
    Comment(String),
    /// `<?target ...?>` including delimiters.
    Instruction(String),
    /// `<?xml ...?>` including delimiters.
    Declaration(String),
    /// `<!DOCTYPE ...>` including delimiters.
    Doctype(String),
}

impl Node {
    /// True for text nodes that contain only whitespace.
    pub fn is_blank_text(&self) -> bool {
        matches!(self, Node::Text(t) if t.trim().is_empty())
    }
}

/// An attribute with its value kept escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Qualified name as written (`path`, `svg:path`, ...).
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    /// Serialise as `<name ... />` when there are no children.
    pub self_closing: bool,
}

/// Strip a namespace prefix: `svg:path` → `path`.
pub fn local_name(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}

fn names_match(qualified: &str, local: &str) -> bool {
    local_name(qualified).eq_ignore_ascii_case(local)
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: false,
        }
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Tag match ignoring namespace prefix and ASCII case.
    pub fn is(&self, local: &str) -> bool {
        names_match(&self.name, local)
    }

    /// Raw (escaped) value of the first attribute whose local name matches.
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| names_match(&a.name, local))
            .map(|a| a.value.as_str())
    }

    /// Unescaped value of an attribute; falls back to the raw value.
    pub fn attr_text(&self, local: &str) -> Option<Cow<'_, str>> {
        self.attr(local)
            .map(|raw| unescape(raw).unwrap_or(Cow::Borrowed(raw)))
    }

    pub fn has_attr(&self, local: &str) -> bool {
        self.attr(local).is_some()
    }

    /// Append an attribute. `value` is escaped for double-quoted output.
    pub fn push_attr(&mut self, name: impl Into<String>, value: &str) {
        self.attributes.push(Attribute {
            name: name.into(),
            value: quick_xml::escape::escape(value).into_owned(),
        });
    }

    /// Remove every attribute whose (qualified) name satisfies `pred`.
    /// Returns how many were removed.
    pub fn remove_attrs(&mut self, mut pred: impl FnMut(&str) -> bool) -> usize {
        let before = self.attributes.len();
        self.attributes.retain(|a| !pred(&a.name));
        before - self.attributes.len()
    }

    /// True when the element has no children besides whitespace.
    pub fn is_blank(&self) -> bool {
        self.children.iter().all(Node::is_blank_text)
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Concatenated, unescaped character data of direct text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(raw) => out.push_str(&unescape(raw).unwrap_or(Cow::Borrowed(raw))),
                Node::CData(raw) => out.push_str(cdata_body(raw)),
                _ => {}
            }
        }
        out
    }

    /// Visit this element and every descendant element, parents first.
    pub fn for_each_element_mut(&mut self, f: &mut dyn FnMut(&mut Element)) {
        f(self);
        for child in &mut self.children {
            if let Node::Element(e) = child {
                e.for_each_element_mut(f);
            }
        }
    }

    /// Depth-first search (pre-order) over descendants, excluding `self`.
    pub fn find_descendant(&self, pred: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        for child in self.child_elements() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(pred) {
                return Some(found);
            }
        }
        None
    }

    /// Drop descendant elements matching `pred` (whole subtrees). Returns the
    /// number of elements removed.
    pub fn remove_descendants(&mut self, pred: &dyn Fn(&Element) -> bool) -> usize {
        let mut removed = 0;
        self.children.retain(|n| match n {
            Node::Element(e) if pred(e) => {
                removed += 1;
                false
            }
            _ => true,
        });
        for child in &mut self.children {
            if let Node::Element(e) = child {
                removed += e.remove_descendants(pred);
            }
        }
        removed
    }

    /// Remove whitespace-only text nodes throughout the subtree.
    pub fn strip_blank_text(&mut self) {
        self.children.retain(|n| !n.is_blank_text());
        for child in &mut self.children {
            if let Node::Element(e) = child {
                e.strip_blank_text();
            }
        }
    }

    fn push_child(&mut self, node: Node) {
        if let Node::Text(text) = &node {
            if let Some(Node::Text(prev)) = self.children.last_mut() {
                prev.push_str(text);
                return;
            }
        }
        self.children.push(node);
    }

    /// Write `<name attr="...">` (or the self-closing form) without children.
    pub(crate) fn write_open_tag(&self, out: &mut String, close: &str) {
        out.push('<');
        out.push_str(&self.name);
        for attr in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", attr.name, attr.value.replace('"', "&quot;"));
        }
        out.push_str(close);
    }

    fn write_to(&self, out: &mut String) {
        if self.children.is_empty() && self.self_closing {
            self.write_open_tag(out, " />");
            return;
        }
        self.write_open_tag(out, ">");
        for child in &self.children {
            child.write_to(out);
        }
        let _ = write!(out, "</{}>", self.name);
    }
}

fn cdata_body(raw: &str) -> &str {
    raw.strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(raw)
}

impl Node {
    /// Raw text of a non-element node.
    pub fn raw(&self) -> Option<&str> {
        match self {
            Node::Element(_) => None,
            Node::Text(s)
            | Node::CData(s)
            | Node::Comment(s)
            | Node::Instruction(s)
            | Node::Declaration(s)
            | Node::Doctype(s) => Some(s),
        }
    }

    fn write_to(&self, out: &mut String) {
        match self {
            Node::Element(e) => e.write_to(out),
            other => out.push_str(other.raw().unwrap_or_default()),
        }
    }
}

impl fmt::Display for XmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for node in &self.prolog {
            node.write_to(&mut out);
        }
        self.root.write_to(&mut out);
        for node in &self.epilog {
            node.write_to(&mut out);
        }
        f.write_str(&out)
    }
}

impl XmlDocument {
    /// Build a document around a bare root element.
    pub fn from_root(root: Element) -> Self {
        Self {
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
        }
    }

    /// Parse `src`, enforcing well-formedness.
    pub fn parse(src: &str) -> Result<Self, XmlError> {
        parse(src)
    }

    pub fn strip_blank_text(&mut self) {
        self.prolog.retain(|n| !n.is_blank_text());
        self.epilog.retain(|n| !n.is_blank_text());
        self.root.strip_blank_text();
    }
}

// ── Parser ───────────────────────────────────────────────────────────────────

/// `<!ENTITY name "value">` in an internal DTD subset. Parameter entities
/// (`<!ENTITY % ...>`) and external ones are not matched.
static RE_ENTITY_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<!ENTITY\s+([A-Za-z_:][-\w.:]*)\s+(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

struct Builder {
    prolog: Vec<Node>,
    root: Option<Element>,
    epilog: Vec<Node>,
    open: Vec<Element>,
    /// General entities declared in the DOCTYPE, name → replacement text.
    entities: HashMap<String, String>,
}

impl Builder {
    fn attach(&mut self, node: Node, pos: usize) -> Result<(), XmlError> {
        if let Some(parent) = self.open.last_mut() {
            parent.push_child(node);
            return Ok(());
        }
        match node {
            Node::Element(e) => {
                if self.root.is_some() {
                    return Err(XmlError::new(pos, "junk after document element"));
                }
                self.root = Some(e);
            }
            Node::Text(ref t) if !t.trim().is_empty() => {
                return Err(XmlError::new(pos, "text outside the document element"));
            }
            Node::Declaration(_) if self.root.is_some() || !self.prolog.is_empty() => {
                return Err(XmlError::new(pos, "XML declaration not at start of document"));
            }
            other => {
                if self.root.is_some() {
                    self.epilog.push(other);
                } else {
                    self.prolog.push(other);
                }
            }
        }
        Ok(())
    }

    fn declare_entities(&mut self, doctype: &str) {
        for caps in RE_ENTITY_DECL.captures_iter(doctype) {
            let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            // first declaration is binding
            self.entities
                .entry(caps[1].to_string())
                .or_insert_with(|| value.to_string());
        }
    }

    fn entity(&self, name: &str) -> Option<&str> {
        resolve_predefined_entity(name).or_else(|| self.entities.get(name).map(String::as_str))
    }

    fn check_entity(&self, name: &str, pos: usize) -> Result<(), XmlError> {
        let known = match name.strip_prefix('#') {
            Some(num) => {
                let code = match num.strip_prefix('x') {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => num.parse::<u32>().ok(),
                };
                code.and_then(char::from_u32).is_some()
            }
            None => self.entity(name).is_some(),
        };
        if known {
            Ok(())
        } else {
            Err(XmlError::new(pos, format!("undefined entity '&{name};'")))
        }
    }

    fn open_element(
        &self,
        reader: &NsReader<&[u8]>,
        start: &BytesStart<'_>,
        self_closing: bool,
        pos: usize,
    ) -> Result<Element, XmlError> {
        let mut element = Element::new(utf8(start.name().as_ref(), pos)?);
        element.self_closing = self_closing;
        for attr in start.attributes() {
            let attr = attr.map_err(|e| XmlError::new(pos, e.to_string()))?;
            let name = utf8(attr.key.as_ref(), pos)?;
            let value = utf8(&attr.value, pos)?;
            if value.contains('<') {
                return Err(XmlError::new(pos, format!("'<' in value of attribute '{name}'")));
            }
            // `xml:` is always bound; `xmlns` declarations are not resolved
            let declaration = name == "xmlns" || name.starts_with("xmlns:");
            if declaration && name != "xmlns" && value.is_empty() {
                return Err(XmlError::new(pos, format!("empty namespace name for '{name}'")));
            }
            if !declaration && !name.starts_with("xml:") {
                if let (ResolveResult::Unknown(prefix), _) = reader.resolve_attribute(attr.key) {
                    return Err(unbound(&prefix, &name, pos));
                }
            }
            unescape_with(&value, |n| self.entity(n))
                .map_err(|e| XmlError::new(pos, format!("attribute '{name}': {e}")))?;
            element.attributes.push(Attribute { name, value });
        }
        Ok(element)
    }
}

fn unbound(prefix: &[u8], name: &str, pos: usize) -> XmlError {
    XmlError::new(
        pos,
        format!(
            "unbound namespace prefix '{}' in '{name}'",
            String::from_utf8_lossy(prefix)
        ),
    )
}

fn position(reader: &NsReader<&[u8]>) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX)
}

fn utf8(bytes: &[u8], pos: usize) -> Result<String, XmlError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| XmlError::new(pos, format!("invalid UTF-8: {e}")))
}

/// Parse `src` into an [`XmlDocument`].
///
/// Besides syntax, every element and attribute prefix must be bound by an
/// `xmlns:*` declaration in scope (`xml:` is always bound), and every entity
/// reference must be predefined, numeric or declared in the DOCTYPE.
pub fn parse(src: &str) -> Result<XmlDocument, XmlError> {
    let mut reader = NsReader::from_str(src);
    reader.config_mut().trim_text(false);

    let mut builder = Builder {
        prolog: Vec::new(),
        root: None,
        epilog: Vec::new(),
        open: Vec::new(),
        entities: HashMap::new(),
    };

    loop {
        let start = position(&reader);
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| XmlError::new(start, e.to_string()))?;
        let unknown_prefix = match ns {
            ResolveResult::Unknown(prefix) => Some(prefix),
            _ => None,
        };
        let end = position(&reader);
        let raw = || {
            src.get(start..end)
                .map(str::to_owned)
                .ok_or_else(|| XmlError::new(start, "event span is not on a char boundary"))
        };

        if let (Some(prefix), Event::Start(e) | Event::Empty(e)) = (&unknown_prefix, &event) {
            return Err(unbound(prefix, &utf8(e.name().as_ref(), start)?, start));
        }

        match event {
            Event::Start(e) => {
                let element = builder.open_element(&reader, &e, false, start)?;
                builder.open.push(element);
            }
            Event::Empty(e) => {
                let element = builder.open_element(&reader, &e, true, start)?;
                builder.attach(Node::Element(element), start)?;
            }
            Event::End(e) => {
                let name = utf8(e.name().as_ref(), start)?;
                let element = builder
                    .open
                    .pop()
                    .ok_or_else(|| XmlError::new(start, format!("unexpected end tag </{name}>")))?;
                if element.name != name {
                    return Err(XmlError::new(
                        start,
                        format!("mismatched tag: expected </{}>, found </{name}>", element.name),
                    ));
                }
                builder.attach(Node::Element(element), start)?;
            }
            Event::Text(_) => builder.attach(Node::Text(raw()?), start)?,
            Event::GeneralRef(e) => {
                let name = utf8(e.as_ref(), start)?;
                builder.check_entity(&name, start)?;
                if builder.open.is_empty() {
                    return Err(XmlError::new(start, "entity reference outside the document element"));
                }
                builder.attach(Node::Text(raw()?), start)?;
            }
            Event::CData(_) => {
                if builder.open.is_empty() {
                    return Err(XmlError::new(start, "CDATA outside the document element"));
                }
                builder.attach(Node::CData(raw()?), start)?;
            }
            Event::Comment(_) => builder.attach(Node::Comment(raw()?), start)?,
            Event::PI(_) => builder.attach(Node::Instruction(raw()?), start)?,
            Event::Decl(_) => builder.attach(Node::Declaration(raw()?), start)?,
            Event::DocType(_) => {
                if builder.root.is_some() || !builder.open.is_empty() {
                    return Err(XmlError::new(start, "DOCTYPE after document element"));
                }
                let doctype = raw()?;
                builder.declare_entities(&doctype);
                builder.attach(Node::Doctype(doctype), start)?;
            }
            Event::Eof => break,
        }
    }

    if let Some(unclosed) = builder.open.last() {
        return Err(XmlError::new(
            src.len(),
            format!("unclosed element <{}>", unclosed.name),
        ));
    }
    let root = builder
        .root
        .ok_or_else(|| XmlError::new(src.len(), "no element found"))?;

    Ok(XmlDocument {
        prolog: builder.prolog,
        root,
        epilog: builder.epilog,
    })
}
