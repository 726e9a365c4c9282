//! XML utility functions for navigating parsed trees and escaping output.

use roxmltree::Node;

/// Get the tag name without namespace prefix.
///
/// # Arguments
/// * `node` - XML node
///
/// # Returns
/// Local tag name (e.g., "book" for both `<book>` and `<bk:book>`)
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use defpi_binding::xml::get_tag_name;
///
/// let xml = r#"<books xmlns="urn:books"><book/></books>"#;
/// let doc = Document::parse(xml).unwrap();
/// assert_eq!(get_tag_name(doc.root_element()), "books");
/// ```
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Get all element children of a node, in document order.
///
/// # Arguments
/// * `node` - Parent node
///
/// # Returns
/// Iterator over child elements; text nodes, comments and processing
/// instructions are skipped
pub fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}

/// Concatenate all direct text children of a node.
///
/// Unlike [`Node::text`], this also picks up text that follows a comment,
/// so `<a>9<!-- x -->.99</a>` yields `"9.99"`.
///
/// # Arguments
/// * `node` - Element whose text to collect
///
/// # Returns
/// The text content with whitespace preserved, empty if there is none
pub fn collect_text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect()
}

/// Check whether a node has direct text content other than whitespace.
///
/// # Arguments
/// * `node` - Element to inspect
///
/// # Returns
/// `true` if any direct text child contains a non-whitespace character
pub fn has_significant_text(node: Node<'_, '_>) -> bool {
    node.children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .any(|text| !text.trim().is_empty())
}

/// Escape character data for use between tags.
///
/// Carriage returns are written as character references because XML
/// parsers normalize literal line endings.
///
/// # Arguments
/// * `text` - Raw character data
///
/// # Returns
/// Escaped text that parses back to `text`
///
/// # Examples
/// ```
/// use defpi_binding::xml::escape_text;
///
/// assert_eq!(escape_text("Tom & Jerry <3"), "Tom &amp; Jerry &lt;3");
/// ```
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a value for use inside a double-quoted attribute.
///
/// Tabs and line breaks are written as character references so they
/// survive attribute-value normalization on the way back in.
///
/// # Arguments
/// * `value` - Raw attribute value
///
/// # Returns
/// Escaped value, without the surrounding quotes
///
/// # Examples
/// ```
/// use defpi_binding::xml::escape_attribute;
///
/// assert_eq!(escape_attribute("say \"hi\"\n"), "say &quot;hi&quot;&#10;");
/// ```
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
    out
}
