//! ContentTree: Arena-backed document model
//!
//! A small mutable DOM-like tree. Nodes live in a `Vec` and are addressed by
//! `NodeId`; detached nodes stay in the arena with no parent, so ids handed
//! out earlier never dangle.
//!
//! Glossary markers are a dedicated node kind carrying a typed `TermRef`
//! rather than an element with an encoded class name.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GlossError, Result};

/// Class written on serialised markers
pub const MARKER_CLASS: &str = "_geau_glossary_concept";

/// Attribute carrying the term index on serialised markers
pub const MARKER_INDEX_ATTR: &str = "data-term-index";

// =============================================================================
// Types
// =============================================================================

/// Handle to a node in a `ContentTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference from a marker back to its term (position in the `TermTable`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TermRef {
    pub index: usize,
}

/// What a node is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element { tag: String },
    Text(String),
    Comment(String),
    /// Inline glossary marker wrapping a matched span
    Marker(TermRef),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    attrs: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

// =============================================================================
// ContentTree
// =============================================================================

/// Mutable document tree
#[derive(Debug, Clone)]
pub struct ContentTree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Default for ContentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentTree {
    /// Create a tree holding only a document root
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(NodeKind::Document)],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Total nodes ever allocated, detached ones included
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData::new(kind));
        id
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Comment(text.into()))
    }

    pub fn create_marker(&mut self, term_index: usize) -> NodeId {
        self.alloc(NodeKind::Marker(TermRef { index: term_index }))
    }

    /// Append an element child and return it
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let el = self.create_element(tag);
        self.append_child(parent, el);
        el
    }

    /// Append a text child and return it
    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        let node = self.create_text(text);
        self.append_child(parent, node);
        node
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Insert `child` into `parent` at position `at` (clamped)
    pub fn insert_child(&mut self, parent: NodeId, at: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.index()].children;
        let at = at.min(children.len());
        children.insert(at, child);
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Insert `node` directly after `reference` in the same parent
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> Result<()> {
        let parent = self.parent(reference).ok_or(GlossError::InvalidNode(reference))?;
        let pos = self.position(reference).ok_or(GlossError::InvalidNode(reference))?;
        self.insert_child(parent, pos + 1, node);
        Ok(())
    }

    /// Remove a node from its parent; the subtree stays in the arena
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|&c| c != node);
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn kind(&self, node: NodeId) -> &NodeKind {
        &self.nodes[node.index()].kind
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.index()].children
    }

    /// Index of `node` among its parent's children
    pub fn position(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|&c| c == node)
    }

    /// Tag name for elements (markers report `span`)
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match self.kind(node) {
            NodeKind::Element { tag } => Some(tag.as_str()),
            NodeKind::Marker(_) => Some("span"),
            _ => None,
        }
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match self.kind(node) {
            NodeKind::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }

    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(self.kind(node), NodeKind::Text(_))
    }

    pub fn is_marker(&self, node: NodeId) -> bool {
        matches!(self.kind(node), NodeKind::Marker(_))
    }

    /// Term reference carried by a marker
    pub fn marker_term(&self, node: NodeId) -> Option<TermRef> {
        match self.kind(node) {
            NodeKind::Marker(term) => Some(*term),
            _ => None,
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node.index()]
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attrs(&self, node: NodeId) -> &[(String, String)] {
        &self.nodes[node.index()].attrs
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        let attrs = &mut self.nodes[node.index()].attrs;
        match attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => attrs.push((name.to_string(), value)),
        }
    }

    /// Whitespace-separated class list contains `class`
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attr(node, "class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// True if `node` is `ancestor` or lies below it
    pub fn is_inclusive_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// True if the node is reachable from the document root
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.is_inclusive_descendant(node, self.root)
    }

    // -------------------------------------------------------------------------
    // Traversal
    // -------------------------------------------------------------------------

    /// Pre-order descendants of `node`, excluding `node` itself
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Markers below `node`, in document order
    pub fn markers_in(&self, node: NodeId) -> Vec<NodeId> {
        self.descendants(node)
            .into_iter()
            .filter(|&n| self.is_marker(n))
            .collect()
    }

    /// Concatenated text of every text leaf below `node`
    pub fn text_content(&self, node: NodeId) -> String {
        if let Some(t) = self.text(node) {
            return t.to_string();
        }
        self.descendants(node)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// First element with the given `id` attribute
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&n| self.attr(n, "id") == Some(id))
    }

    /// First element with the given tag name
    pub fn first_element(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&n| matches!(self.kind(n), NodeKind::Element { tag: t } if t == tag))
    }

    // -------------------------------------------------------------------------
    // Mutation primitives used by matching and cleanup
    // -------------------------------------------------------------------------

    /// Split a text node at `offset` (bytes). The left part stays in `node`;
    /// the right part becomes a new sibling inserted after it and is returned.
    pub fn split_text(&mut self, node: NodeId, offset: usize) -> Result<NodeId> {
        let tail = match &mut self.nodes[node.index()].kind {
            NodeKind::Text(t) if offset <= t.len() && t.is_char_boundary(offset) => t.split_off(offset),
            _ => return Err(GlossError::InvalidNode(node)),
        };
        let right = self.create_text(tail);
        if self.parent(node).is_some() {
            self.insert_after(node, right)?;
        }
        Ok(right)
    }

    /// Put `wrapper` where `node` is and move `node` inside it
    pub fn wrap(&mut self, node: NodeId, wrapper: NodeId) -> Result<()> {
        let parent = self.parent(node).ok_or(GlossError::InvalidNode(node))?;
        let pos = self.position(node).ok_or(GlossError::InvalidNode(node))?;
        self.insert_child(parent, pos, wrapper);
        self.append_child(wrapper, node);
        Ok(())
    }

    /// Replace `node` with its own children, then detach it
    pub fn unwrap(&mut self, node: NodeId) -> Result<()> {
        let parent = self.parent(node).ok_or(GlossError::InvalidNode(node))?;
        let pos = self.position(node).ok_or(GlossError::InvalidNode(node))?;
        let children = std::mem::take(&mut self.nodes[node.index()].children);
        for (offset, child) in children.iter().enumerate() {
            self.nodes[child.index()].parent = Some(parent);
            self.nodes[parent.index()].children.insert(pos + offset, *child);
        }
        self.detach(node);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
