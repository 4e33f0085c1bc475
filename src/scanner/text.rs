//! TextScanner: Text leaf enumeration and workload sizing
//!
//! Matching works on prose segments: runs of text leaves that belong to the
//! same block context. A block element starts a new segment so a label can
//! never match across a paragraph boundary. Non-prose elements (scripts,
//! form controls, embedded SVG...) are never scanned.

use std::ops::Range;

use crate::dom::{ContentTree, NodeId, NodeKind};

/// Elements whose content is never prose
const NON_PROSE_ELEMENTS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "textarea", "select", "option",
    "optgroup", "svg", "math", "iframe", "object", "embed", "video", "audio", "canvas",
    "input", "button", "map",
];

/// Elements that bound a prose context
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "caption", "dd", "details", "dialog",
    "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "hgroup", "hr", "html", "legend", "li", "main", "menu", "nav",
    "ol", "p", "pre", "section", "summary", "table", "tbody", "td", "tfoot", "th", "thead",
    "tr", "ul", "br",
];

pub fn is_non_prose(tag: &str) -> bool {
    NON_PROSE_ELEMENTS.contains(&tag)
}

pub fn is_block(tag: &str) -> bool {
    BLOCK_ELEMENTS.contains(&tag)
}

/// Count text-bearing leaves under `node`. A text node counts 1; containers
/// count the sum over their children; comments count 0.
pub fn count_text_units(tree: &ContentTree, node: NodeId) -> usize {
    match tree.kind(node) {
        NodeKind::Text(_) => 1,
        NodeKind::Comment(_) => 0,
        NodeKind::Document | NodeKind::Element { .. } | NodeKind::Marker(_) => tree
            .children(node)
            .iter()
            .map(|&child| count_text_units(tree, child))
            .sum(),
    }
}

/// Total text units across several regions
pub fn count_regions(tree: &ContentTree, regions: &[NodeId]) -> usize {
    regions.iter().map(|&r| count_text_units(tree, r)).sum()
}

/// A text leaf and the byte range it occupies in its segment text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLeaf {
    pub node: NodeId,
    pub range: Range<usize>,
    /// Term index of the innermost marker enclosing the leaf
    pub claimed_by: Option<usize>,
}

/// Concatenated text of one prose context
#[derive(Debug, Clone, Default)]
pub struct TextSegment {
    pub text: String,
    pub leaves: Vec<TextLeaf>,
}

impl TextSegment {
    fn push(&mut self, node: NodeId, text: &str, claimed_by: Option<usize>) {
        let start = self.text.len();
        self.text.push_str(text);
        self.leaves.push(TextLeaf {
            node,
            range: start..self.text.len(),
            claimed_by,
        });
    }

    /// Leaves overlapping `[start, end)`
    pub fn leaves_in(&self, start: usize, end: usize) -> impl Iterator<Item = &TextLeaf> {
        self.leaves
            .iter()
            .filter(move |leaf| leaf.range.start < end && leaf.range.end > start)
    }

    /// True when no marker of another term covers any byte of `[start, end)`
    pub fn is_free_for(&self, start: usize, end: usize, term_index: usize) -> bool {
        self.leaves_in(start, end)
            .all(|leaf| leaf.claimed_by.map_or(true, |owner| owner == term_index))
    }
}

/// Split the prose under `region` into segments, in document order
pub fn collect_segments(tree: &ContentTree, region: NodeId) -> Vec<TextSegment> {
    let mut segments = Vec::new();
    let mut current = TextSegment::default();
    let mut claimed_by = None;
    let mut ancestor = tree.parent(region);
    while let Some(node) = ancestor {
        if let Some(term) = tree.marker_term(node) {
            claimed_by = Some(term.index);
            break;
        }
        ancestor = tree.parent(node);
    }
    walk(tree, region, claimed_by, &mut current, &mut segments);
    flush(&mut current, &mut segments);
    segments
}

fn flush(current: &mut TextSegment, segments: &mut Vec<TextSegment>) {
    if !current.leaves.is_empty() {
        segments.push(std::mem::take(current));
    }
}

fn walk(
    tree: &ContentTree,
    node: NodeId,
    claimed_by: Option<usize>,
    current: &mut TextSegment,
    segments: &mut Vec<TextSegment>,
) {
    match tree.kind(node) {
        NodeKind::Text(text) => {
            if !text.is_empty() {
                current.push(node, text, claimed_by);
            }
        }
        NodeKind::Comment(_) => {}
        NodeKind::Marker(term) => {
            for &child in tree.children(node) {
                walk(tree, child, Some(term.index), current, segments);
            }
        }
        NodeKind::Document => {
            for &child in tree.children(node) {
                walk(tree, child, claimed_by, current, segments);
            }
        }
        NodeKind::Element { tag } => {
            if is_non_prose(tag) {
                return;
            }
            let block = is_block(tag);
            if block {
                flush(current, segments);
            }
            for &child in tree.children(node) {
                walk(tree, child, claimed_by, current, segments);
            }
            if block {
                flush(current, segments);
            }
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
    fn test_count_empty_region() {
        let mut tree = ContentTree::new();
        let root = tree.root();
        let div = tree.append_element(root, "div");
        assert_eq!(count_text_units(&tree, div), 0);
    }

    #[test]
    fn test_count_single_leaf() {
        let tree = ContentTree::parse_html("<div><p>hello</p></div>").unwrap();
        let div = tree.first_element("div").unwrap();
        assert_eq!(count_text_units(&tree, div), 1);
    }

    #[test]
    fn test_count_is_monotonic_when_adding_children() {
        let mut tree = ContentTree::parse_html("<div><p>a</p><!-- c --></div>").unwrap();
        let div = tree.first_element("div").unwrap();
        let before = count_text_units(&tree, div);

        let span = tree.append_element(div, "span");
        assert!(count_text_units(&tree, div) >= before);
        tree.append_text(span, "b");
        assert_eq!(count_text_units(&tree, div), before + 1);
    }

    #[test]
    fn test_count_text_node_itself() {
        let tree = ContentTree::parse_html("<p>x</p>").unwrap();
        let p = tree.first_element("p").unwrap();
        let text = tree.children(p)[0];
        assert_eq!(count_text_units(&tree, text), 1);
    }

    #[test]
    fn test_segments_break_on_blocks() {
        let tree = ContentTree::parse_html("<div>intro <b>bold</b><p>para one</p>tail</div>").unwrap();
        let div = tree.first_element("div").unwrap();
        let segments = collect_segments(&tree, div);

        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["intro bold", "para one", "tail"]);
        assert_eq!(segments[0].leaves.len(), 2);
        assert_eq!(segments[0].leaves[1].range, 6..10);
    }

    #[test]
    fn test_segments_skip_non_prose() {
        let tree = ContentTree::parse_html("<div>a<script>var eau = 1;</script>b<textarea>eau</textarea></div>").unwrap();
        let div = tree.first_element("div").unwrap();
        let segments = collect_segments(&tree, div);

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "ab");
    }

    #[test]
    fn test_leaves_record_enclosing_marker() {
        let mut tree = ContentTree::parse_html("<p>L'eau potable est rare</p>").unwrap();
        let p = tree.first_element("p").unwrap();
        let text = tree.children(p)[0];
        let word = tree.split_text(text, 2).unwrap();
        tree.split_text(word, 11).unwrap();
        let marker = tree.create_marker(4);
        tree.wrap(word, marker).unwrap();

        let segment = collect_segments(&tree, p).remove(0);
        let claims: Vec<Option<usize>> = segment.leaves.iter().map(|l| l.claimed_by).collect();
        assert_eq!(claims, vec![None, Some(4), None]);

        assert!(segment.is_free_for(2, 13, 4));
        assert!(!segment.is_free_for(2, 5, 1));
        assert!(!segment.is_free_for(6, 17, 1));
        assert!(segment.is_free_for(14, 17, 1));
    }

    #[test]
    fn test_leaves_in_range() {
        let tree = ContentTree::parse_html("<p>ab<i>cd</i>ef</p>").unwrap();
        let p = tree.first_element("p").unwrap();
        let segment = collect_segments(&tree, p).remove(0);

        assert_eq!(segment.leaves_in(1, 3).count(), 2);
        assert_eq!(segment.leaves_in(2, 4).count(), 1);
        assert_eq!(segment.leaves_in(0, 6).count(), 3);
    }
}
