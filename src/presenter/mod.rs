//! AnnotationPresenter: Turns surviving markers into focusable popover anchors
//!
//! For every marker in a region:
//! - the marker gets `tabindex="0"`, the dashed underline and a stable `id`
//! - it is wrapped in a plain `span` container (no tabindex of its own) that
//!   the popover is appended to, so focus order stays that of the text
//! - its term is resolved from the table and the definition card is rendered
//! - a popover is attached through the capability and registered

pub mod content;
pub mod popover;

pub use content::*;
pub use popover::*;

use crate::config::PresenterConfig;
use crate::dom::{ContentTree, NodeId};
use crate::error::{GlossError, Result};
use crate::glossary::TermTable;

pub const MARKER_STYLE: &str = "border-bottom: 1px dashed #333;";

/// Prefix of the `id` given to each presented marker
pub const MARKER_ID_PREFIX: &str = "geau-term-";

/// Owns the popover capability and every popover it attached
pub struct AnnotationPresenter<P: PopoverCapability> {
    capability: P,
    config: PresenterConfig,
    registry: PopoverRegistry<P::Handle>,
}

impl<P: PopoverCapability + Default> Default for AnnotationPresenter<P> {
    fn default() -> Self {
        Self::new(P::default(), PresenterConfig::default())
    }
}

impl<P: PopoverCapability> AnnotationPresenter<P> {
    pub fn new(capability: P, config: PresenterConfig) -> Self {
        Self {
            capability,
            config,
            registry: PopoverRegistry::new(),
        }
    }

    pub fn config(&self) -> &PresenterConfig {
        &self.config
    }

    pub fn capability(&self) -> &P {
        &self.capability
    }

    pub fn registry(&self) -> &PopoverRegistry<P::Handle> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PopoverRegistry<P::Handle> {
        &mut self.registry
    }

    /// Present every not-yet-presented marker under `region`.
    /// Returns the number of popovers attached.
    pub fn present_region(&mut self, tree: &mut ContentTree, region: NodeId, table: &TermTable) -> Result<usize> {
        let mut attached = 0;
        for marker in tree.markers_in(region) {
            if self.registry.get(marker).is_some() {
                continue;
            }
            self.present_marker(tree, marker, table)?;
            attached += 1;
        }
        Ok(attached)
    }

    /// Present one marker and return its anchor
    pub fn present_marker(&mut self, tree: &mut ContentTree, marker: NodeId, table: &TermTable) -> Result<PopoverAnchor> {
        let term_ref = tree.marker_term(marker).ok_or(GlossError::InvalidNode(marker))?;
        let term = match table.get(term_ref.index) {
            Some(term) => term,
            None => {
                log::error!(
                    "marker {} points at term {} but only {} terms are loaded",
                    marker,
                    term_ref.index,
                    table.len()
                );
                debug_assert!(false, "unknown term index {}", term_ref.index);
                return Err(GlossError::UnknownTermIndex {
                    index: term_ref.index,
                    len: table.len(),
                });
            }
        };

        let dom_id = match tree.attr(marker, "id") {
            Some(id) => id.to_string(),
            None => format!("{}{}", MARKER_ID_PREFIX, marker.index()),
        };
        tree.set_attr(marker, "id", dom_id.as_str());
        tree.set_attr(marker, "tabindex", "0");
        tree.set_attr(marker, "style", MARKER_STYLE);

        let container = tree.create_element("span");
        tree.wrap(marker, container)?;

        let anchor = PopoverAnchor {
            marker,
            container,
            dom_id,
        };
        let content = render_definition(term, &self.config);
        let handle = self.capability.attach(&anchor, &content, &self.config.popover);
        self.registry.register(anchor.clone(), handle);
        Ok(anchor)
    }

    /// Drop the popover of a marker that was removed from the tree, and
    /// unwrap its container. Returns false if the marker had no popover.
    pub fn release(&mut self, tree: &mut ContentTree, marker: NodeId) -> Result<bool> {
        let anchor = match self.registry.release(marker) {
            Some(anchor) => anchor,
            None => return Ok(false),
        };
        if tree.parent(anchor.container).is_some() {
            tree.unwrap(anchor.container)?;
        }
        Ok(true)
    }

    /// Global dismiss: hide every visible popover
    pub fn dismiss_all(&mut self) -> usize {
        self.registry.hide_all()
    }

    /// Page teardown
    pub fn teardown(&mut self) {
        self.registry.clear();
    }
}
