//! Tolerant markup fragment parser.
//!
//! Parses a markup string into a node tree the way a browser's fragment
//! parser would for the subset components produce:
//! - Elements with quoted, unquoted and boolean attributes
//! - Void elements (`<input>`, `<br>`, ...) and explicit `/>` self-closing
//! - Raw text elements (`<script>`, `<style>`, `<textarea>`, `<title>`)
//! - Comments, doctypes and processing instructions
//! - Stray or mismatched closing tags (ignored or implicitly closed)
//!
//! The parser never fails. Anything it cannot make sense of becomes text.
//! Byte offsets are kept for the root tag name so callers can rewrite the
//! original string without re-serializing it.

// =============================================================================
// Types
// =============================================================================

bitflags::bitflags! {
    /// Structural flags of a parsed element.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ElementFlags: u8 {
        const NONE         = 0;
        /// Element never has children (`<input>`, `<br>`, ...).
        const VOID         = 1 << 0;
        /// Written with a trailing `/>`.
        const SELF_CLOSING = 1 << 1;
        /// Content is kept verbatim as a single text child.
        const RAW_TEXT     = 1 << 2;
    }
}

/// An attribute as written. Boolean attributes have no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

/// A parsed element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lower-cased tag name.
    pub name: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<Node>,
    pub flags: ElementFlags,
    /// Byte offset of the opening `<` in the source.
    pub start: usize,
    /// Byte offset just past the tag name in the source.
    pub name_end: usize,
}

impl Element {
    /// Attribute value. Boolean attributes read as an empty string.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_deref().unwrap_or(""))
    }
}

/// A parsed node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Whitespace-only text and comments do not count as content.
    pub fn is_insignificant(&self) -> bool {
        match self {
            Node::Element(_) => false,
            Node::Text(text) => text.trim().is_empty(),
            Node::Comment(_) => true,
        }
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Whether `name` never has children.
pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

// =============================================================================
// Parser
// =============================================================================

/// Parse a markup fragment into its top-level nodes.
pub fn parse_fragment(src: &str) -> Vec<Node> {
    Parser::new(src).run()
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    stack: Vec<Element>,
    top: Vec<Node>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            stack: Vec::new(),
            top: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Node> {
        let mut text_start = self.pos;

        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] != b'<' {
                self.pos += 1;
                continue;
            }

            let markup_start = self.pos;
            let handled = if self.rest().starts_with("<!--") {
                self.flush_text(text_start, markup_start);
                self.comment();
                true
            } else if self.rest().starts_with("</") && self.peek_is_alpha(2) {
                self.flush_text(text_start, markup_start);
                self.closing_tag();
                true
            } else if self.rest().starts_with("<!") || self.rest().starts_with("<?") {
                self.flush_text(text_start, markup_start);
                self.skip_past(b'>');
                true
            } else if self.peek_is_alpha(1) {
                self.flush_text(text_start, markup_start);
                self.opening_tag();
                true
            } else {
                false
            };

            if handled {
                text_start = self.pos;
            } else {
                // A lone '<' is plain text
                self.pos += 1;
            }
        }

        self.flush_text(text_start, self.bytes.len());
        while !self.stack.is_empty() {
            self.close_top();
        }
        self.top
    }

    // -------------------------------------------------------------------------
    // Cursor helpers
    // -------------------------------------------------------------------------

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek_is_alpha(&self, offset: usize) -> bool {
        self.bytes
            .get(self.pos + offset)
            .is_some_and(u8::is_ascii_alphabetic)
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn skip_past(&mut self, byte: u8) {
        match self.bytes[self.pos..].iter().position(|&b| b == byte) {
            Some(offset) => self.pos += offset + 1,
            None => self.pos = self.bytes.len(),
        }
    }

    fn take_name(&mut self) -> &'a str {
        let start = self.pos;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if b.is_ascii_whitespace() || b == b'>' || b == b'/' || b == b'=' {
                break;
            }
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    // -------------------------------------------------------------------------
    // Tree building
    // -------------------------------------------------------------------------

    fn push_node(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.top.push(node),
        }
    }

    fn close_top(&mut self) {
        if let Some(element) = self.stack.pop() {
            self.push_node(Node::Element(element));
        }
    }

    fn flush_text(&mut self, start: usize, end: usize) {
        if start < end {
            let text = self.src[start..end].to_string();
            self.push_node(Node::Text(text));
        }
    }

    // -------------------------------------------------------------------------
    // Constructs
    // -------------------------------------------------------------------------

    fn comment(&mut self) {
        let body_start = self.pos + 4;
        match self.src[body_start..].find("-->") {
            Some(offset) => {
                let body = self.src[body_start..body_start + offset].to_string();
                self.pos = body_start + offset + 3;
                self.push_node(Node::Comment(body));
            }
            None => {
                let body = self.src[body_start..].to_string();
                self.pos = self.bytes.len();
                self.push_node(Node::Comment(body));
            }
        }
    }

    fn closing_tag(&mut self) {
        self.pos += 2;
        let name = self.take_name().to_ascii_lowercase();
        self.skip_past(b'>');

        // Close everything up to the matching open element; ignore strays
        if let Some(depth) = self.stack.iter().rposition(|el| el.name == name) {
            while self.stack.len() > depth {
                self.close_top();
            }
        }
    }

    fn opening_tag(&mut self) {
        let start = self.pos;
        self.pos += 1;
        let name = self.take_name().to_ascii_lowercase();
        let name_end = self.pos;

        let mut element = Element {
            name,
            attrs: Vec::new(),
            children: Vec::new(),
            flags: ElementFlags::NONE,
            start,
            name_end,
        };

        loop {
            self.skip_whitespace();
            match self.bytes.get(self.pos) {
                None => break,
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') => {
                    self.pos += 1;
                    if self.bytes.get(self.pos) == Some(&b'>') {
                        self.pos += 1;
                        element.flags |= ElementFlags::SELF_CLOSING;
                        break;
                    }
                    // Stray slash inside a tag, as in `<br/ >`
                }
                Some(_) => {
                    if let Some(attr) = self.attribute() {
                        element.attrs.push(attr);
                    }
                }
            }
        }

        if is_void(&element.name) {
            element.flags |= ElementFlags::VOID;
        }

        if element.flags.intersects(ElementFlags::VOID | ElementFlags::SELF_CLOSING) {
            self.push_node(Node::Element(element));
        } else if RAW_TEXT_ELEMENTS.contains(&element.name.as_str()) {
            element.flags |= ElementFlags::RAW_TEXT;
            self.raw_text(&mut element);
            self.push_node(Node::Element(element));
        } else {
            self.stack.push(element);
        }
    }

    fn attribute(&mut self) -> Option<Attribute> {
        let name = self.take_name();
        if name.is_empty() {
            // '=' with no name; drop it
            self.pos += 1;
            return None;
        }
        let name = name.to_ascii_lowercase();

        self.skip_whitespace();
        if self.bytes.get(self.pos) != Some(&b'=') {
            return Some(Attribute { name, value: None });
        }
        self.pos += 1;
        self.skip_whitespace();

        let value = match self.bytes.get(self.pos) {
            Some(&quote) if quote == b'"' || quote == b'\'' => {
                let value_start = self.pos + 1;
                self.pos = value_start;
                self.skip_past(quote);
                let value_end = if self.pos > value_start && self.bytes[self.pos - 1] == quote {
                    self.pos - 1
                } else {
                    self.pos
                };
                self.src[value_start..value_end].to_string()
            }
            _ => {
                let value_start = self.pos;
                while self.pos < self.bytes.len() {
                    let b = self.bytes[self.pos];
                    if b.is_ascii_whitespace() || b == b'>' {
                        break;
                    }
                    self.pos += 1;
                }
                self.src[value_start..self.pos].to_string()
            }
        };

        Some(Attribute { name, value: Some(value) })
    }

    fn raw_text(&mut self, element: &mut Element) {
        let closing = format!("</{}", element.name);
        let body_start = self.pos;
        let lower = self.src[body_start..].to_ascii_lowercase();
        match lower.find(&closing) {
            Some(offset) => {
                let body = &self.src[body_start..body_start + offset];
                if !body.is_empty() {
                    element.children.push(Node::Text(body.to_string()));
                }
                self.pos = body_start + offset;
                self.skip_past(b'>');
            }
            None => {
                let body = &self.src[body_start..];
                if !body.is_empty() {
                    element.children.push(Node::Text(body.to_string()));
                }
                self.pos = self.bytes.len();
            }
        }
    }
}

// =============================================================================
// Serialization
// =============================================================================

/// Append the markup for `node` to `out`.
pub fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(text),
        Node::Comment(body) => {
            out.push_str("<!--");
            out.push_str(body);
            out.push_str("-->");
        }
        Node::Element(element) => {
            write_open_tag(&element.name, &element.attrs, element.flags, out);
            if element.flags.intersects(ElementFlags::VOID | ElementFlags::SELF_CLOSING) {
                return;
            }
            for child in &element.children {
                write_node(child, out);
            }
            write_close_tag(&element.name, out);
        }
    }
}

/// Append an opening tag.
pub fn write_open_tag(name: &str, attrs: &[Attribute], flags: ElementFlags, out: &mut String) {
    out.push('<');
    out.push_str(name);
    for attr in attrs {
        out.push(' ');
        out.push_str(&attr.name);
        if let Some(value) = &attr.value {
            out.push_str("=\"");
            out.push_str(&value.replace('"', "&quot;"));
            out.push('"');
        }
    }
    if flags.contains(ElementFlags::SELF_CLOSING) && !flags.contains(ElementFlags::VOID) {
        out.push_str(" />");
    } else {
        out.push('>');
    }
}

/// Append a closing tag.
pub fn write_close_tag(name: &str, out: &mut String) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &Node) -> &Element {
        node.as_element().expect("element")
    }

    #[test]
    fn test_single_element() {
        let nodes = parse_fragment("<h1>Hello</h1>");
        assert_eq!(nodes.len(), 1);
        let h1 = element(&nodes[0]);
        assert_eq!(h1.name, "h1");
        assert_eq!(h1.start, 0);
        assert_eq!(h1.name_end, 3);
        assert_eq!(h1.children, vec![Node::Text("Hello".into())]);
    }

    #[test]
    fn test_attributes() {
        let nodes = parse_fragment(r#"<input id=name data-spark-bind='first' disabled value="a b">"#);
        let input = element(&nodes[0]);
        assert!(input.flags.contains(ElementFlags::VOID));
        assert_eq!(input.attr("id"), Some("name"));
        assert_eq!(input.attr("data-spark-bind"), Some("first"));
        assert_eq!(input.attr("disabled"), Some(""));
        assert_eq!(input.attr("value"), Some("a b"));
        assert_eq!(input.attr("missing"), None);
    }

    #[test]
    fn test_nesting_and_voids() {
        let nodes = parse_fragment("<form><div><input /><br/ ></div><p>x</p></form>");
        assert_eq!(nodes.len(), 1);
        let form = element(&nodes[0]);
        assert_eq!(form.children.len(), 2);
        let div = element(&form.children[0]);
        assert_eq!(div.children.len(), 2);
        assert_eq!(element(&div.children[1]).name, "br");
    }

    #[test]
    fn test_siblings_and_whitespace() {
        let nodes = parse_fragment("  <a></a>\n<b></b> ");
        let elements: Vec<_> = nodes.iter().filter_map(Node::as_element).collect();
        assert_eq!(elements.len(), 2);
        assert!(nodes[0].is_insignificant());
    }

    #[test]
    fn test_unclosed_and_stray_tags() {
        let nodes = parse_fragment("<div><span>text</div></em>");
        assert_eq!(nodes.len(), 1);
        let div = element(&nodes[0]);
        let span = element(&div.children[0]);
        assert_eq!(span.children, vec![Node::Text("text".into())]);
    }

    #[test]
    fn test_comments_and_lone_angle() {
        let nodes = parse_fragment("<!-- note --><p>1 < 2</p>");
        assert_eq!(nodes[0], Node::Comment(" note ".into()));
        let p = element(&nodes[1]);
        assert_eq!(p.children, vec![Node::Text("1 < 2".into())]);
    }

    #[test]
    fn test_raw_text() {
        let nodes = parse_fragment("<script>if (a < b) {}</script>");
        let script = element(&nodes[0]);
        assert!(script.flags.contains(ElementFlags::RAW_TEXT));
        assert_eq!(script.children, vec![Node::Text("if (a < b) {}".into())]);
    }

    #[test]
    fn test_serialize() {
        let nodes = parse_fragment(r#"<div class="a"><input disabled><span>x</span></div>"#);
        let mut out = String::new();
        write_node(&nodes[0], &mut out);
        assert_eq!(out, r#"<div class="a"><input disabled><span>x</span></div>"#);
    }
}
