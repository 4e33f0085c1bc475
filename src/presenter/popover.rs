//! Popover capability seam and the registry of attached popovers
//!
//! The popover widget itself lives outside the crate (a tooltip library in
//! the browser). The engine only needs to attach one to an anchor and later
//! show, hide or destroy it, so that is the whole capability surface.

use serde::{Deserialize, Serialize};

use crate::config::PopoverOptions;
use crate::dom::NodeId;

// =============================================================================
// Capability
// =============================================================================

/// Where a popover is anchored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopoverAnchor {
    pub marker: NodeId,
    /// Plain wrapper the popover is appended to
    pub container: NodeId,
    /// `id` attribute set on the marker
    pub dom_id: String,
}

/// A live popover
pub trait PopoverHandle {
    fn show(&mut self);
    fn hide(&mut self);
    fn is_visible(&self) -> bool;
    /// Release widget resources. Called once, when the anchor goes away.
    fn destroy(&mut self) {}
}

/// Something that can attach popovers to anchors
pub trait PopoverCapability {
    type Handle: PopoverHandle;

    fn attach(&mut self, anchor: &PopoverAnchor, content: &str, options: &PopoverOptions) -> Self::Handle;
}

// =============================================================================
// Described popovers
// =============================================================================

/// Serializable description of a popover, for hosts that attach it themselves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopoverDescriptor {
    pub anchor_id: String,
    pub content: String,
    pub options: PopoverOptions,
}

/// Handle over a description; visibility is tracked locally
#[derive(Debug, Clone, PartialEq)]
pub struct DescribedPopover {
    pub descriptor: PopoverDescriptor,
    visible: bool,
    destroyed: bool,
}

impl DescribedPopover {
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl PopoverHandle for DescribedPopover {
    fn show(&mut self) {
        if !self.destroyed {
            self.visible = true;
        }
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn destroy(&mut self) {
        self.visible = false;
        self.destroyed = true;
    }
}

/// Capability that only records what should be attached
#[derive(Debug, Clone, Copy, Default)]
pub struct Describer;

impl PopoverCapability for Describer {
    type Handle = DescribedPopover;

    fn attach(&mut self, anchor: &PopoverAnchor, content: &str, options: &PopoverOptions) -> DescribedPopover {
        DescribedPopover {
            descriptor: PopoverDescriptor {
                anchor_id: anchor.dom_id.clone(),
                content: content.to_string(),
                options: options.clone(),
            },
            visible: false,
            destroyed: false,
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Every popover attached on the page, keyed by marker
#[derive(Debug)]
pub struct PopoverRegistry<H> {
    entries: Vec<(PopoverAnchor, H)>,
}

impl<H> Default for PopoverRegistry<H> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<H: PopoverHandle> PopoverRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, anchor: PopoverAnchor, handle: H) {
        self.entries.push((anchor, handle));
    }

    /// Destroy and forget the popover bound to `marker`
    pub fn release(&mut self, marker: NodeId) -> Option<PopoverAnchor> {
        let pos = self.entries.iter().position(|(a, _)| a.marker == marker)?;
        let (anchor, mut handle) = self.entries.remove(pos);
        handle.destroy();
        Some(anchor)
    }

    /// Hide every visible popover; returns how many were hidden
    pub fn hide_all(&mut self) -> usize {
        let mut hidden = 0;
        for (_, handle) in self.entries.iter_mut().filter(|(_, h)| h.is_visible()) {
            handle.hide();
            hidden += 1;
        }
        hidden
    }

    /// Destroy everything (page teardown)
    pub fn clear(&mut self) {
        for (_, handle) in self.entries.iter_mut() {
            handle.destroy();
        }
        self.entries.clear();
    }

    pub fn get(&self, marker: NodeId) -> Option<&H> {
        self.entries
            .iter()
            .find(|(a, _)| a.marker == marker)
            .map(|(_, h)| h)
    }

    pub fn get_mut(&mut self, marker: NodeId) -> Option<&mut H> {
        self.entries
            .iter_mut()
            .find(|(a, _)| a.marker == marker)
            .map(|(_, h)| h)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PopoverAnchor, &H)> {
        self.entries.iter().map(|(a, h)| (a, h))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
