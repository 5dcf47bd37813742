//! Keyed diffing between the render list and the materialized view.

use std::collections::HashMap;
use std::hash::Hash;

use log::{debug, trace};

use crate::error::TreeError;
use crate::source::KeyFn;
use crate::tree::NodeRegistry;
use crate::view::{TemplateSet, ViewRenderer};

/// Owns the host renderer and the applied-state copy of what it shows.
///
/// Each sync diffs the target render list against the applied copy by key
/// and emits the minimal insert/remove/move/update sequence. Until the host
/// reports its first paint, syncs are withheld rather than dropped: the
/// applied copy stays empty, so the first sync after [`ViewBridge::mark_painted`]
/// replays everything deferred so far as one net-effect batch carrying
/// current data.
pub(crate) struct ViewBridge<T, K> {
    renderer: Box<dyn ViewRenderer<T>>,
    key_fn: KeyFn<T, K>,
    /// (key, data) per materialized view, in view order.
    applied: Vec<(K, T)>,
    painted: bool,
}

impl<T, K> ViewBridge<T, K>
where
    T: Clone + PartialEq,
    K: Clone + Eq + Hash,
{
    pub fn new(renderer: Box<dyn ViewRenderer<T>>, key_fn: KeyFn<T, K>) -> Self {
        Self {
            renderer,
            key_fn,
            applied: Vec::new(),
            painted: false,
        }
    }

    pub fn is_painted(&self) -> bool {
        self.painted
    }

    /// Mark the host as painted and replay everything withheld so far.
    pub fn mark_painted(
        &mut self,
        target: &[T],
        templates: &TemplateSet<T>,
        registry: &NodeRegistry<K>,
    ) -> Result<bool, TreeError> {
        if self.painted {
            return Ok(false);
        }
        self.painted = true;
        debug!("first paint reported, replaying deferred view sync");
        self.sync(target, templates, registry)
    }

    /// Diff the render list against the applied state and emit renderer ops.
    ///
    /// Returns whether any op was emitted.
    pub fn sync(
        &mut self,
        target: &[T],
        templates: &TemplateSet<T>,
        registry: &NodeRegistry<K>,
    ) -> Result<bool, TreeError> {
        if !self.painted {
            trace!("view sync deferred until first paint");
            return Ok(false);
        }

        let mut changed = false;
        let target_keys: HashMap<K, usize> = target
            .iter()
            .enumerate()
            .map(|(i, n)| ((self.key_fn)(n), i))
            .collect();

        // Drop views whose keys left the list, highest index first.
        for index in (0..self.applied.len()).rev() {
            if !target_keys.contains_key(&self.applied[index].0) {
                self.renderer.remove(index);
                self.applied.remove(index);
                changed = true;
            }
        }

        // Bring every target position up to date with inserts and moves.
        for (index, node) in target.iter().enumerate() {
            let key = (self.key_fn)(node);
            let current = self.applied.iter().position(|(k, _)| *k == key);
            match current {
                None => {
                    let template = templates.resolve(index, node)?;
                    self.renderer.insert(index, template, node);
                    self.applied.insert(index, (key, node.clone()));
                    changed = true;
                }
                Some(from) if from != index => {
                    self.renderer.move_node(from, index);
                    let entry = self.applied.remove(from);
                    self.applied.insert(index, entry);
                    changed = true;
                }
                Some(_) => {}
            }
        }

        // Refresh views whose backing data changed in place.
        for (index, node) in target.iter().enumerate() {
            let (key, applied) = &mut self.applied[index];
            if applied != node {
                match registry.handle_of(key) {
                    Some(handle) => self.renderer.update(handle.as_ref(), node),
                    None => debug!("data changed for an unmaterialized node view, update skipped"),
                }
                *applied = node.clone();
                changed = true;
            }
        }

        if changed {
            trace!("view sync applied, {} views materialized", self.applied.len());
        }
        Ok(changed)
    }
}
