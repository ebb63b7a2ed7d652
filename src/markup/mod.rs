//! Markup - fragment parsing, root validation and identity stamping.
//!
//! Render output is plain markup text. The engine only needs three things
//! from it:
//! - Does it have exactly one root element?
//! - Where does the root tag name end, so the instance id can be stamped?
//! - A node tree, for hosts that keep an in-memory document.

mod parser;

pub use parser::{
    Attribute, Element, ElementFlags, Node, is_void, parse_fragment, write_close_tag, write_node,
    write_open_tag,
};

/// The single root element of a fragment.
///
/// Whitespace-only text and comments around the root are ignored. Any other
/// text, or a second element, means there is no single root.
pub fn single_root(nodes: &[Node]) -> Option<&Element> {
    let mut root = None;
    for node in nodes {
        match node {
            Node::Element(element) => {
                if root.is_some() {
                    return None;
                }
                root = Some(element);
            }
            other if other.is_insignificant() => {}
            _ => return None,
        }
    }
    root
}

/// Whether `markup` parses to exactly one top-level element.
pub fn has_single_root(markup: &str) -> bool {
    single_root(&parse_fragment(markup)).is_some()
}

/// Insert ` attr="value"` right after the tag name of the first top-level element.
///
/// Every other byte of `markup` is left untouched. Returns the markup unchanged
/// when it contains no element.
pub fn stamp_root(markup: &str, attr: &str, value: impl std::fmt::Display) -> String {
    let nodes = parse_fragment(markup);
    let Some(root) = nodes.iter().find_map(Node::as_element) else {
        return markup.to_string();
    };

    let stamp = format!(" {attr}=\"{value}\"");
    let mut out = String::with_capacity(markup.len() + stamp.len());
    out.push_str(&markup[..root.name_end]);
    out.push_str(&stamp);
    out.push_str(&markup[root.name_end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_root() {
        assert!(has_single_root("<h1>Hello</h1>"));
        assert!(has_single_root("\n  <section><p>a</p><p>b</p></section>\n"));
        assert!(has_single_root("<!-- lead --><div></div>"));
        assert!(has_single_root("<input>"));
    }

    #[test]
    fn test_not_single_root() {
        assert!(!has_single_root(""));
        assert!(!has_single_root("   "));
        assert!(!has_single_root("just text"));
        assert!(!has_single_root("<p>a</p><p>b</p>"));
        assert!(!has_single_root("<p>a</p> trailing"));
    }

    #[test]
    fn test_stamp_root() {
        assert_eq!(
            stamp_root("<h1>Hello</h1>", "data-spark-id", 0),
            r#"<h1 data-spark-id="0">Hello</h1>"#
        );
        assert_eq!(
            stamp_root(r#"  <div class="x"><span>y</span></div>"#, "data-spark-id", 7),
            r#"  <div data-spark-id="7" class="x"><span>y</span></div>"#
        );
        assert_eq!(
            stamp_root("<br/>", "data-spark-id", 2),
            r#"<br data-spark-id="2"/>"#
        );
    }

    #[test]
    fn test_stamp_without_element() {
        assert_eq!(stamp_root("text", "data-spark-id", 1), "text");
    }
}
