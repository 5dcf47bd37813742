//! Level, parent, and sibling-group caches.

use std::collections::HashMap;
use std::hash::Hash;

use crate::source::KeyFn;

/// Caches describing the latest committed flattened list.
///
/// Rebuilt from scratch on every data recomputation and swapped in
/// atomically, so a superseded pass can never leak partial entries.
/// Collapsing a node hides its descendants from the render list but
/// leaves these entries alone.
pub struct TreeCaches<T, K> {
    key_fn: KeyFn<T, K>,
    /// Depth of each node (0 = root).
    levels: HashMap<K, usize>,
    /// Parent node data, `None` for roots.
    parents: HashMap<K, Option<T>>,
    /// Ordered sibling groups keyed by parent (`None` = the root group).
    groups: HashMap<Option<K>, Vec<T>>,
}

impl<T: Clone, K: Clone + Eq + Hash> TreeCaches<T, K> {
    /// Create empty caches.
    pub(crate) fn new(key_fn: KeyFn<T, K>) -> Self {
        Self {
            key_fn,
            levels: HashMap::new(),
            parents: HashMap::new(),
            groups: HashMap::new(),
        }
    }

    /// Key of a node.
    pub(crate) fn key_of(&self, node: &T) -> K {
        (self.key_fn)(node)
    }

    /// Record one node during a recomputation pass.
    ///
    /// Nodes must be recorded in flattened (pre-order) order so sibling
    /// groups come out in document order.
    pub(crate) fn record(&mut self, node: &T, level: usize, parent: Option<&T>) {
        let key = (self.key_fn)(node);
        let parent_key = parent.map(|p| (self.key_fn)(p));
        self.levels.insert(key.clone(), level);
        self.parents.insert(key, parent.cloned());
        self.groups.entry(parent_key).or_default().push(node.clone());
    }

    /// Depth of a node, if cached.
    pub fn level_of(&self, key: &K) -> Option<usize> {
        self.levels.get(key).copied()
    }

    /// Parent node data. `None` for roots and unknown keys.
    pub fn parent_of(&self, key: &K) -> Option<&T> {
        self.parents.get(key).and_then(|p| p.as_ref())
    }

    /// Children of a node in document order.
    pub fn children_of(&self, key: &K) -> &[T] {
        self.groups
            .get(&Some(key.clone()))
            .map(|g| g.as_slice())
            .unwrap_or(&[])
    }

    /// Size of the sibling group containing a node.
    pub fn set_size(&self, key: &K) -> Option<usize> {
        self.sibling_group(key).map(|g| g.len())
    }

    /// 1-based position of a node within its sibling group.
    pub fn position_in_set(&self, key: &K) -> Option<usize> {
        let group = self.sibling_group(key)?;
        group
            .iter()
            .position(|n| (self.key_fn)(n) == *key)
            .map(|i| i + 1)
    }

    /// Check whether a node has children.
    pub fn is_expandable(&self, key: &K) -> bool {
        !self.children_of(key).is_empty()
    }

    fn sibling_group(&self, key: &K) -> Option<&Vec<T>> {
        let parent_key = self.parents.get(key)?.as_ref().map(|p| (self.key_fn)(p));
        self.groups.get(&parent_key)
    }
}
