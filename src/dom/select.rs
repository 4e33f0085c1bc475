//! Region selection from pipe-delimited selector lists
//!
//! Supports the subset of CSS the loader attributes use in practice:
//! `tag`, `#id`, `.class`, `[attr]`, `[attr=value]`, compounds of these and
//! descendant combinators (`main .content p`).

use super::tree::{ContentTree, NodeId, NodeKind};

/// What to return when a selector list resolves to nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// `<body>`, or the document root when there is no body
    Body,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrTest {
    Present(String),
    Equals(String, String),
}

/// One compound selector such as `div.note#main[data-x]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

/// Descendant chain of compounds, outermost first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    parts: Vec<Compound>,
}

impl Selector {
    /// Parse a single selector; `None` when it is empty or malformed
    pub fn parse(input: &str) -> Option<Self> {
        let parts: Option<Vec<Compound>> = input.split_whitespace().map(parse_compound).collect();
        let parts = parts?;
        if parts.is_empty() {
            return None;
        }
        Some(Self { parts })
    }

    /// True if `node` matches the whole chain
    pub fn matches(&self, tree: &ContentTree, node: NodeId) -> bool {
        let (last, ancestors) = match self.parts.split_last() {
            Some(split) => split,
            None => return false,
        };
        if !last.matches(tree, node) {
            return false;
        }

        // Greedy right-to-left ancestor walk
        let mut current = tree.parent(node);
        for compound in ancestors.iter().rev() {
            loop {
                match current {
                    Some(n) if compound.matches(tree, n) => {
                        current = tree.parent(n);
                        break;
                    }
                    Some(n) => current = tree.parent(n),
                    None => return false,
                }
            }
        }
        true
    }
}

fn parse_compound(input: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let mut rest = input;

    let tag_end = rest.find(['#', '.', '[']).unwrap_or(rest.len());
    let tag = &rest[..tag_end];
    if !tag.is_empty() && tag != "*" {
        compound.tag = Some(tag.to_ascii_lowercase());
    }
    rest = &rest[tag_end..];

    while let Some(first) = rest.chars().next() {
        match first {
            '#' | '.' => {
                let body = &rest[1..];
                let end = body.find(['#', '.', '[']).unwrap_or(body.len());
                let name = &body[..end];
                if name.is_empty() {
                    return None;
                }
                if first == '#' {
                    compound.id = Some(name.to_string());
                } else {
                    compound.classes.push(name.to_string());
                }
                rest = &body[end..];
            }
            '[' => {
                let close = rest.find(']')?;
                let inner = &rest[1..close];
                let test = match inner.split_once('=') {
                    Some((name, value)) => AttrTest::Equals(
                        name.trim().to_ascii_lowercase(),
                        value.trim().trim_matches(|c| c == '"' || c == '\'').to_string(),
                    ),
                    None => AttrTest::Present(inner.trim().to_ascii_lowercase()),
                };
                compound.attrs.push(test);
                rest = &rest[close + 1..];
            }
            _ => return None,
        }
    }

    Some(compound)
}

impl Compound {
    fn matches(&self, tree: &ContentTree, node: NodeId) -> bool {
        let tag = match tree.kind(node) {
            NodeKind::Element { tag } => tag.as_str(),
            _ => return false,
        };
        if let Some(want) = &self.tag {
            if want != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if tree.attr(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| tree.has_class(node, c)) {
            return false;
        }
        self.attrs.iter().all(|test| match test {
            AttrTest::Present(name) => tree.attr(node, name).is_some(),
            AttrTest::Equals(name, value) => tree.attr(node, name) == Some(value.as_str()),
        })
    }
}

/// Resolve a pipe-delimited selector list into region handles.
///
/// Results are in document order, deduplicated, and a region nested inside
/// another selected region is dropped so no subtree is processed twice.
pub fn select_regions(tree: &ContentTree, list: Option<&str>, fallback: Fallback) -> Vec<NodeId> {
    let selectors: Vec<Selector> = list
        .unwrap_or("")
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            let parsed = Selector::parse(s);
            if parsed.is_none() {
                log::warn!("ignoring unsupported selector {:?}", s);
            }
            parsed
        })
        .collect();

    let mut found: Vec<NodeId> = Vec::new();
    if !selectors.is_empty() {
        for node in tree.descendants(tree.root()) {
            if selectors.iter().any(|sel| sel.matches(tree, node)) {
                let covered = found.iter().any(|&outer| tree.is_inclusive_descendant(node, outer));
                if !covered {
                    found.push(node);
                }
            }
        }
    }

    if found.is_empty() && fallback == Fallback::Body {
        let body = tree.first_element("body").unwrap_or_else(|| tree.root());
        found.push(body);
    }
    found
}

// =============================================================================
// Tests
// =============================================================================
