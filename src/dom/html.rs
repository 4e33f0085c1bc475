//! Markup loading and serialisation for `ContentTree`
//!
//! Loading uses quick-xml in a lenient configuration so that ordinary
//! HTML pages work: void elements need no closing tag, stray end tags are
//! ignored, attributes may be unquoted or valueless. Entities are decoded
//! with the HTML entity table, so `&nbsp;` and friends survive.
//!
//! `script` and `style` bodies are raw text. Before the reader sees them
//! they are shielded in CDATA sections, and they are written back verbatim.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::tree::{ContentTree, NodeId, NodeKind, MARKER_CLASS, MARKER_INDEX_ATTR};
use crate::error::{GlossError, Result};

/// Elements that never have content
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose body is raw text, not markup
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

pub fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

/// Opening tag of a raw-text element at or after `from`:
/// (byte after its `>`, tag name, self-closing)
fn next_raw_text_open(lower: &str, from: usize) -> Option<(usize, &'static str, bool)> {
    let mut pos = from;
    while let Some(offset) = lower[pos..].find('<') {
        let name_start = pos + offset + 1;
        pos = name_start;
        let tag = RAW_TEXT_ELEMENTS.iter().copied().find(|tag| {
            lower[name_start..].starts_with(tag)
                && lower[name_start + tag.len()..].starts_with(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
        });
        if let Some(tag) = tag {
            let close = name_start + lower[name_start..].find('>')?;
            return Some((close + 1, tag, lower[..close].ends_with('/')));
        }
    }
    None
}

/// Wrap every `script`/`style` body in CDATA so `<` and `&` inside it reach
/// the tree untouched
fn shield_raw_text(markup: &str) -> Cow<'_, str> {
    let lower = markup.to_ascii_lowercase();
    let mut out = String::new();
    let mut copied = 0;
    let mut pos = 0;

    while let Some((body_start, tag, self_closing)) = next_raw_text_open(&lower, pos) {
        if self_closing {
            pos = body_start;
            continue;
        }
        let close = format!("</{}", tag);
        let body_end = lower[body_start..]
            .find(close.as_str())
            .map_or(markup.len(), |offset| body_start + offset);
        let body = &markup[body_start..body_end];
        if !body.is_empty() {
            out.push_str(&markup[copied..body_start]);
            out.push_str("<![CDATA[");
            out.push_str(&body.replace("]]>", "]]]]><![CDATA[>"));
            out.push_str("]]>");
            copied = body_end;
        }
        pos = body_end;
    }

    if copied == 0 {
        Cow::Borrowed(markup)
    } else {
        out.push_str(&markup[copied..]);
        Cow::Owned(out)
    }
}

impl ContentTree {
    /// Parse a page or fragment into a new tree
    pub fn parse_html(markup: &str) -> Result<Self> {
        let mut tree = ContentTree::new();
        let root = tree.root();
        tree.parse_into(root, markup)?;
        Ok(tree)
    }

    /// Parse markup and append the resulting nodes under `parent`
    pub fn parse_into(&mut self, parent: NodeId, markup: &str) -> Result<()> {
        let markup = shield_raw_text(markup);
        let mut reader = Reader::from_str(&markup);
        reader.trim_text(false);
        reader.check_end_names(false);

        let mut stack: Vec<NodeId> = vec![parent];

        loop {
            let current = *stack.last().unwrap_or(&parent);
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    let el = self.element_from(&start)?;
                    self.append_child(current, el);
                    let tag = self.tag(el).unwrap_or_default().to_string();
                    if !is_void_element(&tag) {
                        stack.push(el);
                    }
                }
                Ok(Event::Empty(start)) => {
                    let el = self.element_from(&start)?;
                    self.append_child(current, el);
                }
                Ok(Event::End(end)) => {
                    let name = String::from_utf8_lossy(end.name().as_ref()).to_ascii_lowercase();
                    // Close up to the nearest matching open element; ignore strays
                    if let Some(depth) = stack
                        .iter()
                        .skip(1)
                        .rposition(|&n| self.tag(n) == Some(name.as_str()))
                    {
                        stack.truncate(depth + 1);
                    }
                }
                Ok(Event::Text(text)) => {
                    let raw = String::from_utf8_lossy(&text);
                    let value = html_escape::decode_html_entities(&raw).into_owned();
                    if !value.is_empty() {
                        self.append_text(current, value);
                    }
                }
                Ok(Event::CData(data)) => {
                    let value = String::from_utf8_lossy(&data).into_owned();
                    self.append_text(current, value);
                }
                Ok(Event::Comment(comment)) => {
                    let value = String::from_utf8_lossy(&comment).into_owned();
                    let node = self.create_comment(value);
                    self.append_child(current, node);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(GlossError::Markup(format!(
                        "at byte {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
            }
        }

        Ok(())
    }

    fn element_from(&mut self, start: &BytesStart<'_>) -> Result<NodeId> {
        let tag = String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase();
        let el = self.create_element(&tag);
        for attr in start.html_attributes().with_checks(false) {
            let attr = attr.map_err(|e| GlossError::Markup(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
            let raw = String::from_utf8_lossy(&attr.value);
            let value = html_escape::decode_html_entities(&raw).into_owned();
            self.set_attr(el, &key, value);
        }
        Ok(el)
    }

    /// Serialise `node` and its subtree
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_node(node, &mut out);
        out
    }

    /// Serialise only the children of `node`
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(node) {
            self.write_node(child, &mut out);
        }
        out
    }

    fn write_node(&self, node: NodeId, out: &mut String) {
        match self.kind(node) {
            NodeKind::Document => {
                for &child in self.children(node) {
                    self.write_node(child, out);
                }
            }
            NodeKind::Text(text) => out.push_str(&html_escape::encode_text(text)),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Element { tag } => {
                out.push('<');
                out.push_str(tag);
                self.write_attrs(node, out);
                if is_void_element(tag) && self.children(node).is_empty() {
                    out.push_str(" />");
                    return;
                }
                out.push('>');
                let raw = is_raw_text_element(tag);
                for &child in self.children(node) {
                    match self.kind(child) {
                        NodeKind::Text(text) if raw => out.push_str(text),
                        _ => self.write_node(child, out),
                    }
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            NodeKind::Marker(term) => {
                out.push_str("<span class=\"");
                out.push_str(MARKER_CLASS);
                out.push_str("\" ");
                out.push_str(MARKER_INDEX_ATTR);
                out.push_str("=\"");
                out.push_str(&term.index.to_string());
                out.push('"');
                self.write_attrs(node, out);
                out.push('>');
                for &child in self.children(node) {
                    self.write_node(child, out);
                }
                out.push_str("</span>");
            }
        }
    }

    fn write_attrs(&self, node: NodeId, out: &mut String) {
        for (key, value) in self.attrs(node) {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&html_escape::encode_double_quoted_attribute(value));
            out.push('"');
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_markup() {
        let tree = ContentTree::parse_html("<div id=\"a\"><p>One <b>two</b></p><p>three</p></div>").unwrap();
        let div = tree.element_by_id("a").unwrap();

        assert_eq!(tree.children(div).len(), 2);
        assert_eq!(tree.text_content(div), "One twothree");
    }

    #[test]
    fn test_parse_void_elements_without_close() {
        let tree = ContentTree::parse_html("<p>a<br>b<img src=\"x.png\">c</p>").unwrap();
        let p = tree.first_element("p").unwrap();

        assert_eq!(tree.text_content(p), "abc");
        assert_eq!(tree.children(p).len(), 5);
    }

    #[test]
    fn test_parse_ignores_stray_end_tag() {
        let tree = ContentTree::parse_html("<p>a</span>b</p>").unwrap();
        let p = tree.first_element("p").unwrap();
        assert_eq!(tree.text_content(p), "ab");
    }

    #[test]
    fn test_entities_are_decoded_and_reencoded() {
        let tree = ContentTree::parse_html("<p>a &amp; b &lt; c</p>").unwrap();
        let p = tree.first_element("p").unwrap();

        assert_eq!(tree.text_content(p), "a & b < c");
        assert_eq!(tree.to_html(p), "<p>a &amp; b &lt; c</p>");
    }

    #[test]
    fn test_html_named_entities() {
        let tree = ContentTree::parse_html("<p>l&#39;eau&nbsp;potable</p>").unwrap();
        let p = tree.first_element("p").unwrap();
        assert_eq!(tree.text_content(p), "l'eau\u{a0}potable");
    }

    #[test]
    fn test_marker_serialisation() {
        let mut tree = ContentTree::parse_html("<p>eau</p>").unwrap();
        let p = tree.first_element("p").unwrap();
        let text = tree.children(p)[0];
        let marker = tree.create_marker(2);
        tree.wrap(text, marker).unwrap();
        tree.set_attr(marker, "tabindex", "0");

        assert_eq!(
            tree.to_html(p),
            "<p><span class=\"_geau_glossary_concept\" data-term-index=\"2\" tabindex=\"0\">eau</span></p>"
        );
    }

    #[test]
    fn test_valueless_attribute() {
        let tree = ContentTree::parse_html("<form><input disabled><p>eau</p></form>").unwrap();
        let input = tree.first_element("input").unwrap();

        assert_eq!(tree.attr(input, "disabled"), Some(""));
        assert_eq!(tree.text_content(tree.root()), "eau");
    }

    #[test]
    fn test_unquoted_attribute_value() {
        let tree = ContentTree::parse_html("<div><p class=x id=intro>eau</p></div>").unwrap();
        let p = tree.element_by_id("intro").unwrap();
        assert_eq!(tree.attr(p, "class"), Some("x"));
    }

    #[test]
    fn test_script_body_is_raw_text() {
        let markup = "<body><script>if (a < b && c) {}</script><p>eau</p></body>";
        let tree = ContentTree::parse_html(markup).unwrap();
        let script = tree.first_element("script").unwrap();

        assert_eq!(tree.text_content(script), "if (a < b && c) {}");
        assert_eq!(tree.first_element("p").map(|p| tree.text_content(p)), Some("eau".to_string()));
        assert_eq!(tree.inner_html(tree.root()), markup);
    }

    #[test]
    fn test_style_and_empty_script_bodies() {
        let markup = "<head><STYLE>p > b { color: red }</STYLE><script src=\"a.js\"></script></head>";
        let tree = ContentTree::parse_html(markup).unwrap();
        let style = tree.first_element("style").unwrap();
        let script = tree.first_element("script").unwrap();

        assert_eq!(tree.text_content(style), "p > b { color: red }");
        assert!(tree.children(script).is_empty());
    }

    #[test]
    fn test_shield_leaves_plain_markup_borrowed() {
        assert!(matches!(shield_raw_text("<p>a</p>"), Cow::Borrowed(_)));
        assert_eq!(
            shield_raw_text("<script>x]]>y</script>"),
            "<script><![CDATA[x]]]]><![CDATA[>y]]></script>"
        );
    }

    #[test]
    fn test_round_trip_keeps_comments() {
        let markup = "<div><!-- note --><p class=\"x\">t</p></div>";
        let tree = ContentTree::parse_html(markup).unwrap();
        assert_eq!(tree.inner_html(tree.root()), markup);
    }
}
