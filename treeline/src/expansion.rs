//! Expansion state shared between the tree and external owners.
//!
//! [`ExpansionModel`] is an expanded-key set with change notification.
//! Cloning shares the same underlying state, so a model owned by the host
//! (or carried by a legacy tree control) and the one held by the tree
//! observe the same keys.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;

/// A change applied to the expanded-key set.
#[derive(Debug, Clone)]
pub struct ExpansionChange<K> {
    /// Keys that became expanded.
    pub added: Vec<K>,
    /// Keys that became collapsed.
    pub removed: Vec<K>,
}

impl<K> ExpansionChange<K> {
    /// Check if the change carries no keys.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

struct ExpansionInner<K> {
    /// Currently expanded keys.
    expanded: HashSet<K>,
    /// Subscribers; dead channels are pruned on emit.
    watchers: Vec<mpsc::UnboundedSender<ExpansionChange<K>>>,
}

impl<K> Default for ExpansionInner<K> {
    fn default() -> Self {
        Self {
            expanded: HashSet::new(),
            watchers: Vec::new(),
        }
    }
}

/// Expanded-key set with change notification.
///
/// Every mutation that actually changes the set emits exactly one
/// [`ExpansionChange`] to all subscribers; idempotent calls emit nothing.
/// Batch operations emit a single change for the whole batch. Mutation
/// methods also return the applied `(added, removed)` delta directly.
pub struct ExpansionModel<K> {
    inner: Arc<RwLock<ExpansionInner<K>>>,
}

impl<K> ExpansionModel<K> {
    /// Create a new model with every key collapsed.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(ExpansionInner::default())),
        }
    }

    /// Subscribe to changes.
    ///
    /// The receiver observes every effective mutation made after this call.
    pub fn changed(&self) -> mpsc::UnboundedReceiver<ExpansionChange<K>> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut guard) = self.inner.write() {
            guard.watchers.push(tx);
        }
        rx
    }
}

impl<K: Clone + Eq + Hash> ExpansionModel<K> {
    /// Check whether a key is expanded.
    pub fn is_expanded(&self, key: &K) -> bool {
        self.inner
            .read()
            .map(|g| g.expanded.contains(key))
            .unwrap_or(false)
    }

    /// Number of expanded keys.
    pub fn len(&self) -> usize {
        self.inner.read().map(|g| g.expanded.len()).unwrap_or(0)
    }

    /// Check if every key is collapsed.
    pub fn is_empty(&self) -> bool {
        self.inner
            .read()
            .map(|g| g.expanded.is_empty())
            .unwrap_or(true)
    }

    /// Snapshot of all expanded keys (unordered).
    pub fn expanded_keys(&self) -> Vec<K> {
        self.inner
            .read()
            .map(|g| g.expanded.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot used by recomputation passes.
    pub(crate) fn snapshot(&self) -> HashSet<K> {
        self.inner
            .read()
            .map(|g| g.expanded.clone())
            .unwrap_or_default()
    }

    /// Expand one key.
    /// Returns (added, removed) keys.
    pub fn expand(&self, key: K) -> (Vec<K>, Vec<K>) {
        if let Ok(mut guard) = self.inner.write()
            && guard.expanded.insert(key.clone())
        {
            let change = ExpansionChange {
                added: vec![key],
                removed: vec![],
            };
            Self::emit(&mut guard, &change);
            return (change.added, change.removed);
        }
        (vec![], vec![])
    }

    /// Collapse one key.
    /// Returns (added, removed) keys.
    pub fn collapse(&self, key: &K) -> (Vec<K>, Vec<K>) {
        if let Ok(mut guard) = self.inner.write()
            && guard.expanded.remove(key)
        {
            let change = ExpansionChange {
                added: vec![],
                removed: vec![key.clone()],
            };
            Self::emit(&mut guard, &change);
            return (change.added, change.removed);
        }
        (vec![], vec![])
    }

    /// Toggle one key between expanded and collapsed.
    /// Returns (added, removed) keys.
    pub fn toggle(&self, key: K) -> (Vec<K>, Vec<K>) {
        if let Ok(mut guard) = self.inner.write() {
            let change = if guard.expanded.remove(&key) {
                ExpansionChange {
                    added: vec![],
                    removed: vec![key],
                }
            } else {
                guard.expanded.insert(key.clone());
                ExpansionChange {
                    added: vec![key],
                    removed: vec![],
                }
            };
            Self::emit(&mut guard, &change);
            return (change.added, change.removed);
        }
        (vec![], vec![])
    }

    /// Expand many keys as one atomic change.
    /// Returns the keys that were newly expanded.
    pub fn expand_many(&self, keys: impl IntoIterator<Item = K>) -> Vec<K> {
        if let Ok(mut guard) = self.inner.write() {
            let mut added = Vec::new();
            for key in keys {
                if guard.expanded.insert(key.clone()) {
                    added.push(key);
                }
            }
            if !added.is_empty() {
                let change = ExpansionChange {
                    added,
                    removed: vec![],
                };
                Self::emit(&mut guard, &change);
                return change.added;
            }
        }
        vec![]
    }

    /// Collapse many keys as one atomic change.
    /// Returns the keys that were newly collapsed.
    pub fn collapse_many(&self, keys: impl IntoIterator<Item = K>) -> Vec<K> {
        if let Ok(mut guard) = self.inner.write() {
            let mut removed = Vec::new();
            for key in keys {
                if guard.expanded.remove(&key) {
                    removed.push(key);
                }
            }
            if !removed.is_empty() {
                let change = ExpansionChange {
                    added: vec![],
                    removed,
                };
                Self::emit(&mut guard, &change);
                return change.removed;
            }
        }
        vec![]
    }

    /// Collapse every key.
    /// Returns the keys that were collapsed.
    pub fn clear(&self) -> Vec<K> {
        if let Ok(mut guard) = self.inner.write() {
            let removed: Vec<K> = guard.expanded.drain().collect();
            if !removed.is_empty() {
                let change = ExpansionChange {
                    added: vec![],
                    removed,
                };
                Self::emit(&mut guard, &change);
                return change.removed;
            }
        }
        vec![]
    }

    fn emit(inner: &mut ExpansionInner<K>, change: &ExpansionChange<K>) {
        inner.watchers.retain(|tx| tx.send(change.clone()).is_ok());
    }
}

impl<K> Default for ExpansionModel<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for ExpansionModel<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
