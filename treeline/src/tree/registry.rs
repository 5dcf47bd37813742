//! Live node view registration.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use crate::error::TreeError;
use crate::view::RenderMode;

/// Host-side handle for a materialized node view.
///
/// The tree stores these to answer relationship queries and to hand the
/// keyboard navigator something it can drive. Only [`NodeHandle::focus`]
/// is required; the rest have inert defaults.
pub trait NodeHandle: Send + Sync {
    /// Move real focus to the node's view.
    fn focus(&self);

    /// Activate the node (primary action).
    fn activate(&self) {}

    /// Whether the node should be skipped during keyboard navigation.
    fn is_disabled(&self) -> bool {
        false
    }

    /// Label used for typeahead matching, if any.
    fn type_ahead_label(&self) -> Option<String> {
        None
    }
}

/// Registration record for a materialized node view.
///
/// The parent key is passed explicitly by the host when the view is
/// created; the tree never guesses it from creation order.
pub struct NodeRecord<K> {
    /// Live handle driving the node's view.
    pub handle: Arc<dyn NodeHandle>,
    /// How the view renders.
    pub mode: RenderMode,
    /// Key of the parent node's view, `None` for a root view.
    pub parent: Option<K>,
}

impl<K> NodeRecord<K> {
    /// Create a record for a root-level view.
    pub fn root(handle: Arc<dyn NodeHandle>, mode: RenderMode) -> Self {
        Self {
            handle,
            mode,
            parent: None,
        }
    }

    /// Create a record for a view nested under a parent.
    pub fn child(handle: Arc<dyn NodeHandle>, mode: RenderMode, parent: K) -> Self {
        Self {
            handle,
            mode,
            parent: Some(parent),
        }
    }
}

/// Registry of materialized node views keyed by expansion key.
pub(crate) struct NodeRegistry<K> {
    records: HashMap<K, NodeRecord<K>>,
}

impl<K: Clone + Eq + Hash> NodeRegistry<K> {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Register a node view, replacing any previous record for the key.
    pub fn register(&mut self, key: K, record: NodeRecord<K>) {
        self.records.insert(key, record);
    }

    /// Drop the record for a destroyed view.
    pub fn unregister(&mut self, key: &K) -> Option<NodeRecord<K>> {
        self.records.remove(key)
    }

    pub fn handle_of(&self, key: &K) -> Option<Arc<dyn NodeHandle>> {
        self.records.get(key).map(|r| Arc::clone(&r.handle))
    }

    /// Count parent links up to a root view.
    ///
    /// Fallback for level queries when a key is absent from the caches. A
    /// chain that leaves the registry before reaching a root view means the
    /// view was registered against a detached parent.
    pub fn level_by_links(&self, key: &K) -> Result<usize, TreeError> {
        let Some(mut record) = self.records.get(key) else {
            return Err(TreeError::structural_integrity("node view is not registered"));
        };
        let mut level = 0;
        let mut seen = HashSet::new();
        seen.insert(key.clone());
        while let Some(parent) = &record.parent {
            if !seen.insert(parent.clone()) {
                return Err(TreeError::structural_integrity(
                    "registration parent links form a cycle",
                ));
            }
            match self.records.get(parent) {
                Some(parent_record) => {
                    level += 1;
                    record = parent_record;
                }
                None => {
                    return Err(TreeError::structural_integrity(
                        "parent view is not registered",
                    ));
                }
            }
        }
        Ok(level)
    }
}
