//! Keyboard navigation bridge.
//!
//! The tree does not own keyboard state. It hands the external navigator a
//! [`KeyNavBridge`] snapshot of the registered node views in flattened
//! order; the navigator owns the active item and calls back into the
//! handles to focus or activate nodes.

use std::sync::Arc;

use crate::tree::NodeHandle;

/// Horizontal arrow interpretation for the host's text direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextDirection {
    /// Left-to-right
    #[default]
    Ltr,
    /// Right-to-left
    Rtl,
}

/// One navigable node in flattened order.
pub struct NavItem<K> {
    key: K,
    handle: Arc<dyn NodeHandle>,
}

impl<K> NavItem<K> {
    pub(crate) fn new(key: K, handle: Arc<dyn NodeHandle>) -> Self {
        Self { key, handle }
    }

    /// Identity used by the navigator to track the active item across
    /// snapshot refreshes.
    pub fn track_by(&self) -> &K {
        &self.key
    }

    /// The live view handle.
    pub fn handle(&self) -> &Arc<dyn NodeHandle> {
        &self.handle
    }

    /// Whether the navigator should skip this item.
    pub fn is_skipped(&self) -> bool {
        self.handle.is_disabled()
    }

    /// Move real focus to the node's view.
    pub fn focus(&self) {
        self.handle.focus();
    }

    /// Activate the node.
    pub fn activate(&self) {
        self.handle.activate();
    }

    /// Label used for typeahead matching, if any.
    pub fn type_ahead_label(&self) -> Option<String> {
        self.handle.type_ahead_label()
    }
}

/// Snapshot handed to the external keyboard navigator.
///
/// Items are the subset of the flattened list that currently has a live
/// registered view, in flattened order. The list is vertical; horizontal
/// arrows are interpreted against [`KeyNavBridge::direction`].
pub struct KeyNavBridge<K> {
    items: Vec<NavItem<K>>,
    direction: TextDirection,
}

impl<K> KeyNavBridge<K> {
    pub(crate) fn new(items: Vec<NavItem<K>>, direction: TextDirection) -> Self {
        Self { items, direction }
    }

    /// Navigable items in flattened order.
    pub fn items(&self) -> &[NavItem<K>] {
        &self.items
    }

    /// Text direction for horizontal arrow interpretation.
    pub fn direction(&self) -> TextDirection {
        self.direction
    }

    /// Number of navigable items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if nothing is navigable.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
