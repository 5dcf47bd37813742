//! The tree engine: configuration, recomputation, and public operations.
//!
//! [`Tree`] converts root data into a single ordered render list, keeps
//! level, parent, and sibling-group caches consistent across updates, and
//! drives the host renderer through keyed diffs.
//!
//! # Example
//!
//! ```ignore
//! use treeline::prelude::*;
//!
//! #[derive(Clone, PartialEq)]
//! struct Entry {
//!     path: String,
//!     children: Vec<Entry>,
//! }
//!
//! let mut tree = Tree::builder()
//!     .keyed_by(|e: &Entry| e.path.clone())
//!     .with_children_accessor(|e: &Entry| Children::ready(e.children.clone()))
//!     .with_renderer(renderer)
//!     .build()?;
//!
//! tree.set_items(load_roots());
//! tree.flush().await?;
//! tree.notify_painted()?;
//! ```

mod cache;
mod compute;
mod registry;

pub use registry::{NodeHandle, NodeRecord};

pub(crate) use registry::NodeRegistry;

use std::hash::Hash;
use std::ops::Range;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use log::{debug, trace};
use tokio::sync::{mpsc, watch};

use crate::error::TreeError;
use crate::expansion::{ExpansionChange, ExpansionModel};
use crate::keynav::{KeyNavBridge, NavItem, TextDirection};
use crate::source::{
    Children, ChildrenFn, ConnectableSource, DataSource, KeyFn, LevelFn, NodeSource, TreeViewer,
};
use crate::view::{NodeTemplate, RenderMode, TemplateSet, ViewBridge, ViewRenderer};

use cache::TreeCaches;
use compute::ComputeOutcome;

/// Legacy combined control bundling structure accessors with an owned
/// expansion model.
///
/// Hosts that manage expansion outside the tree build one of these and hand
/// it to the builder; the tree then shares the control's model instead of
/// creating its own. When both accessors are present the children accessor
/// wins.
pub struct TreeControl<T, K> {
    level_fn: Option<LevelFn<T>>,
    children_fn: Option<ChildrenFn<T>>,
    expansion: ExpansionModel<K>,
}

impl<T, K> TreeControl<T, K> {
    /// Control for pre-flattened input.
    pub fn flat(level_fn: impl Fn(&T) -> usize + Send + Sync + 'static) -> Self {
        Self {
            level_fn: Some(Arc::new(level_fn)),
            children_fn: None,
            expansion: ExpansionModel::new(),
        }
    }

    /// Control for nested input.
    pub fn nested(children_fn: impl Fn(&T) -> Children<T> + Send + Sync + 'static) -> Self {
        Self {
            level_fn: None,
            children_fn: Some(Arc::new(children_fn)),
            expansion: ExpansionModel::new(),
        }
    }

    /// Attach a level accessor alongside the existing configuration.
    pub fn with_level_accessor(
        mut self,
        level_fn: impl Fn(&T) -> usize + Send + Sync + 'static,
    ) -> Self {
        self.level_fn = Some(Arc::new(level_fn));
        self
    }

    /// The expansion model shared with the tree.
    pub fn expansion(&self) -> &ExpansionModel<K> {
        &self.expansion
    }
}

/// Builder for [`Tree`].
///
/// A key accessor, a view renderer, and exactly one of a level accessor, a
/// children accessor, or a tree control must be configured; anything else
/// fails [`TreeBuilder::build`] with [`TreeError::Configuration`].
pub struct TreeBuilder<T, K> {
    key_fn: Option<KeyFn<T, K>>,
    level_fn: Option<LevelFn<T>>,
    children_fn: Option<ChildrenFn<T>>,
    control: Option<TreeControl<T, K>>,
    expansion: Option<ExpansionModel<K>>,
    templates: Vec<NodeTemplate<T>>,
    direction: TextDirection,
    renderer: Option<Box<dyn ViewRenderer<T>>>,
}

impl<T, K> TreeBuilder<T, K> {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            key_fn: None,
            level_fn: None,
            children_fn: None,
            control: None,
            expansion: None,
            templates: Vec::new(),
            direction: TextDirection::default(),
            renderer: None,
        }
    }

    /// Derive expansion keys with the given accessor.
    pub fn keyed_by(mut self, key_fn: impl Fn(&T) -> K + Send + Sync + 'static) -> Self {
        self.key_fn = Some(Arc::new(key_fn));
        self
    }

    /// Read node depth from pre-flattened input.
    pub fn with_level_accessor(
        mut self,
        level_fn: impl Fn(&T) -> usize + Send + Sync + 'static,
    ) -> Self {
        self.level_fn = Some(Arc::new(level_fn));
        self
    }

    /// Read children from nested input.
    pub fn with_children_accessor(
        mut self,
        children_fn: impl Fn(&T) -> Children<T> + Send + Sync + 'static,
    ) -> Self {
        self.children_fn = Some(Arc::new(children_fn));
        self
    }

    /// Adopt a legacy tree control.
    pub fn with_control(mut self, control: TreeControl<T, K>) -> Self {
        self.control = Some(control);
        self
    }

    /// Share an externally owned expansion model.
    pub fn with_expansion_model(mut self, expansion: ExpansionModel<K>) -> Self {
        self.expansion = Some(expansion);
        self
    }

    /// Register a node template.
    ///
    /// A builder with no templates gets an implicit default one.
    pub fn with_template(mut self, template: NodeTemplate<T>) -> Self {
        self.templates.push(template);
        self
    }

    /// Text direction for horizontal arrow interpretation.
    pub fn with_direction(mut self, direction: TextDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Attach the host view renderer.
    pub fn with_renderer(mut self, renderer: impl ViewRenderer<T> + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }
}

impl<T> TreeBuilder<T, T>
where
    T: Clone + Eq + Hash + Send + Sync + 'static,
{
    /// Use the node itself as its expansion key.
    pub fn self_keyed(self) -> Self {
        self.keyed_by(|node: &T| node.clone())
    }
}

impl<T, K> TreeBuilder<T, K>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    K: Clone + Eq + Hash + Send + Sync + 'static,
{
    /// Validate the configuration and construct the tree.
    pub fn build(self) -> Result<Tree<T, K>, TreeError> {
        let Some(key_fn) = self.key_fn else {
            return Err(TreeError::configuration("a key accessor is required"));
        };
        let Some(renderer) = self.renderer else {
            return Err(TreeError::configuration("a view renderer is required"));
        };

        let (node_source, adopted) = match (self.level_fn, self.children_fn, self.control) {
            (Some(level_fn), None, None) => (NodeSource::Flat(level_fn), None),
            (None, Some(children_fn), None) => (NodeSource::Nested(children_fn), None),
            (None, None, Some(control)) => {
                let TreeControl {
                    level_fn,
                    children_fn,
                    expansion,
                } = control;
                let source = if let Some(children_fn) = children_fn {
                    NodeSource::Nested(children_fn)
                } else if let Some(level_fn) = level_fn {
                    NodeSource::Flat(level_fn)
                } else {
                    return Err(TreeError::configuration(
                        "tree control carries no structure accessors",
                    ));
                };
                (source, Some(expansion))
            }
            (None, None, None) => {
                return Err(TreeError::configuration(
                    "one of a level accessor, a children accessor, or a tree control is required",
                ));
            }
            _ => {
                return Err(TreeError::configuration(
                    "conflicting node structure accessors configured",
                ));
            }
        };

        let expansion = adopted.or(self.expansion).unwrap_or_default();

        let mut templates = self.templates;
        if templates.is_empty() {
            templates.push(NodeTemplate::any());
        }
        let templates = TemplateSet::new(templates)?;

        let expansion_rx = expansion.changed();
        let (view_tx, view_rx) = watch::channel(0..0);
        debug!(
            "tree built with a {} node source",
            if node_source.is_flat() { "flat" } else { "nested" }
        );

        Ok(Tree {
            caches: TreeCaches::new(key_fn.clone()),
            bridge: ViewBridge::new(renderer, key_fn.clone()),
            key_fn,
            node_source,
            expansion,
            expansion_rx,
            direction: self.direction,
            templates,
            active: None,
            connected: None,
            pending_data: None,
            roots: Vec::new(),
            flattened: Vec::new(),
            render: Vec::new(),
            registry: NodeRegistry::new(),
            resolved_mode: None,
            layout_dirty: false,
            view_tx,
            view_rx,
        })
    }
}

impl<T, K> Default for TreeBuilder<T, K> {
    fn default() -> Self {
        Self::new()
    }
}

/// The tree engine.
///
/// Single-threaded and cooperative: the engine is the sole writer of its
/// caches and registry, and the host pumps it by calling [`Tree::flush`]
/// whenever upstream work may be pending. External collaborators read
/// snapshots.
pub struct Tree<T, K> {
    key_fn: KeyFn<T, K>,
    node_source: NodeSource<T>,
    expansion: ExpansionModel<K>,
    expansion_rx: mpsc::UnboundedReceiver<ExpansionChange<K>>,
    direction: TextDirection,
    templates: TemplateSet<T>,
    /// Active push stream of root emissions.
    active: Option<BoxStream<'static, Vec<T>>>,
    /// Connected source kept for disconnect on swap or drop.
    connected: Option<Box<dyn ConnectableSource<T>>>,
    /// Latest root emission not yet recomputed.
    pending_data: Option<Vec<T>>,
    /// Roots of the latest committed pass.
    roots: Vec<T>,
    /// Complete pre-order flattening of the latest committed pass.
    flattened: Vec<T>,
    /// Current render list.
    render: Vec<T>,
    caches: TreeCaches<T, K>,
    registry: NodeRegistry<K>,
    /// Render mode latched by the first node view registration.
    resolved_mode: Option<RenderMode>,
    /// Whether the render list must be derived again.
    layout_dirty: bool,
    bridge: ViewBridge<T, K>,
    view_tx: watch::Sender<Range<usize>>,
    view_rx: watch::Receiver<Range<usize>>,
}

impl<T, K> Tree<T, K> {
    /// Start building a tree.
    pub fn builder() -> TreeBuilder<T, K> {
        TreeBuilder::new()
    }

    /// Viewer handle describing what the tree currently renders.
    pub fn viewer(&self) -> TreeViewer {
        TreeViewer::new(self.view_rx.clone())
    }

    /// Text direction used by keyboard navigation.
    pub fn direction(&self) -> TextDirection {
        self.direction
    }

    /// The render mode latched by the first node view registration.
    pub fn render_mode(&self) -> Option<RenderMode> {
        self.resolved_mode
    }

    fn disconnect_source(&mut self) {
        self.active = None;
        self.pending_data = None;
        if let Some(mut connectable) = self.connected.take() {
            let viewer = TreeViewer::new(self.view_rx.clone());
            connectable.disconnect(&viewer);
        }
    }
}

impl<T, K> Tree<T, K>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    K: Clone + Eq + Hash + Send + Sync + 'static,
{
    // -------------------------------------------------------------------------
    // Data sources
    // -------------------------------------------------------------------------

    /// Adopt a data source, disconnecting the previous one.
    ///
    /// The committed view stays in place until the new source emits.
    pub fn set_source(&mut self, source: DataSource<T>) {
        self.disconnect_source();
        match source {
            DataSource::Static(items) => {
                self.pending_data = Some(items);
            }
            DataSource::Stream(stream) => {
                self.active = Some(stream);
            }
            DataSource::Connectable(mut connectable) => {
                let stream = connectable.connect(&self.viewer());
                self.active = Some(stream);
                self.connected = Some(connectable);
            }
        }
    }

    /// Replace the root data with a fixed list.
    pub fn set_items(&mut self, items: Vec<T>) {
        self.set_source(DataSource::Static(items));
    }

    // -------------------------------------------------------------------------
    // Event pump
    // -------------------------------------------------------------------------

    /// Drain ready upstream work, recompute, and sync the view.
    ///
    /// Root emissions are latest-wins: an emission arriving while children
    /// resolution is awaited supersedes the in-flight pass, and its partial
    /// results are discarded. Deferred children futures are the only await
    /// points. Returns whether anything changed.
    pub async fn flush(&mut self) -> Result<bool, TreeError> {
        let mut recomputed = false;
        loop {
            self.poll_active();
            if self.drain_expansion_events() {
                self.layout_dirty = true;
            }
            let Some(roots) = self.pending_data.take() else {
                break;
            };

            debug!("recomputing from {} roots", roots.len());
            let outcome = match &self.node_source {
                NodeSource::Flat(level_fn) => ComputeOutcome::Done(compute::compute_flat(
                    roots.clone(),
                    level_fn.clone(),
                    self.key_fn.clone(),
                )),
                NodeSource::Nested(children_fn) => {
                    let children_fn = children_fn.clone();
                    compute::compute_nested(
                        roots.clone(),
                        children_fn,
                        self.key_fn.clone(),
                        &mut self.active,
                    )
                    .await?
                }
            };
            match outcome {
                ComputeOutcome::Done(result) => {
                    self.roots = roots;
                    self.flattened = result.flattened;
                    self.caches = result.caches;
                    self.layout_dirty = true;
                    recomputed = true;
                    trace!("committed {} flattened nodes", self.flattened.len());
                }
                ComputeOutcome::Superseded(newer) => {
                    self.pending_data = Some(newer);
                }
            }
        }

        if !self.layout_dirty {
            return Ok(false);
        }
        self.layout_dirty = false;
        self.derive_render();
        let synced = self
            .bridge
            .sync(&self.render, &self.templates, &self.registry)?;
        if synced {
            self.publish_view_range();
        }
        Ok(recomputed || synced)
    }

    /// Report that the host completed its first paint.
    ///
    /// Everything deferred before this point is applied as one net-effect
    /// batch carrying current data.
    pub fn notify_painted(&mut self) -> Result<bool, TreeError> {
        let changed = self
            .bridge
            .mark_painted(&self.render, &self.templates, &self.registry)?;
        if changed {
            self.publish_view_range();
        }
        Ok(changed)
    }

    /// Check whether the host has reported its first paint.
    ///
    /// View syncs are withheld until this returns `true`.
    pub fn is_painted(&self) -> bool {
        self.bridge.is_painted()
    }

    /// Adopt every ready root emission, keeping only the newest.
    fn poll_active(&mut self) {
        while let Some(stream) = self.active.as_mut() {
            match stream.next().now_or_never() {
                Some(Some(items)) => {
                    trace!("adopted a ready root emission");
                    self.pending_data = Some(items);
                }
                Some(None) => {
                    debug!("data stream ended");
                    self.active = None;
                }
                None => break,
            }
        }
    }

    /// Drain queued expansion changes.
    fn drain_expansion_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(change) = self.expansion_rx.try_recv() {
            trace!(
                "expansion change: {} expanded, {} collapsed",
                change.added.len(),
                change.removed.len()
            );
            changed = true;
        }
        changed
    }

    /// Derive the render list for the current mode and expansion state.
    fn derive_render(&mut self) {
        let mode = self.resolved_mode.unwrap_or(RenderMode::Flat);
        self.render = match mode {
            RenderMode::Flat => {
                let expanded = self.expansion.snapshot();
                compute::filter_visible(&self.flattened, &self.caches, &expanded)
            }
            RenderMode::Nested => match &self.node_source {
                NodeSource::Nested(_) => self.roots.clone(),
                NodeSource::Flat(_) => self
                    .flattened
                    .iter()
                    .filter(|n| self.caches.level_of(&(self.key_fn)(n)) == Some(0))
                    .cloned()
                    .collect(),
            },
        };
    }

    fn publish_view_range(&self) {
        let _ = self.view_tx.send(0..self.render.len());
    }

    // -------------------------------------------------------------------------
    // Expansion
    // -------------------------------------------------------------------------

    /// The shared expansion model.
    pub fn expansion(&self) -> &ExpansionModel<K> {
        &self.expansion
    }

    /// Key of a node.
    pub fn key_of(&self, node: &T) -> K {
        (self.key_fn)(node)
    }

    /// Check whether a node is expanded.
    pub fn is_expanded(&self, node: &T) -> bool {
        self.expansion.is_expanded(&self.key_of(node))
    }

    /// Expand a node.
    pub fn expand(&self, node: &T) {
        self.expansion.expand(self.key_of(node));
    }

    /// Collapse a node.
    pub fn collapse(&self, node: &T) {
        self.expansion.collapse(&self.key_of(node));
    }

    /// Toggle a node between expanded and collapsed.
    pub fn toggle(&self, node: &T) {
        self.expansion.toggle(self.key_of(node));
    }

    /// Expand a node and all of its descendants as one batch.
    pub fn expand_descendants(&self, node: &T) {
        let key = self.key_of(node);
        let mut keys = self.descendant_keys(&key);
        keys.insert(0, key);
        self.expansion.expand_many(keys);
    }

    /// Collapse a node and all of its descendants as one batch.
    pub fn collapse_descendants(&self, node: &T) {
        let key = self.key_of(node);
        let mut keys = self.descendant_keys(&key);
        keys.insert(0, key);
        self.expansion.collapse_many(keys);
    }

    /// Expand every node seen by the latest pass as one batch.
    pub fn expand_all(&self) {
        let keys: Vec<K> = self.flattened.iter().map(|n| self.key_of(n)).collect();
        self.expansion.expand_many(keys);
    }

    /// Collapse every node as one batch. Roots stay rendered.
    pub fn collapse_all(&self) {
        self.expansion.clear();
    }

    /// Keys of all descendants of a node, in flattened order.
    fn descendant_keys(&self, key: &K) -> Vec<K> {
        let mut keys = Vec::new();
        let Some(start) = self.flattened.iter().position(|n| self.key_of(n) == *key) else {
            return keys;
        };
        let Some(level) = self.caches.level_of(key) else {
            return keys;
        };
        for node in &self.flattened[start + 1..] {
            let k = self.key_of(node);
            if self.caches.level_of(&k).unwrap_or(0) <= level {
                break;
            }
            keys.push(k);
        }
        keys
    }

    // -------------------------------------------------------------------------
    // Cache queries
    // -------------------------------------------------------------------------

    /// Depth of a node (0 = root).
    ///
    /// Falls back to counting registration parent links when the key is
    /// absent from the caches.
    pub fn level_of(&self, key: &K) -> Result<usize, TreeError> {
        if let Some(level) = self.caches.level_of(key) {
            return Ok(level);
        }
        trace!("level cache miss, walking registration links");
        self.registry.level_by_links(key)
    }

    /// Parent node data, `None` for roots.
    pub fn parent_of(&self, key: &K) -> Option<T> {
        self.caches.parent_of(key).cloned()
    }

    /// Children of a node in document order.
    pub fn children_of(&self, key: &K) -> Vec<T> {
        self.caches.children_of(key).to_vec()
    }

    /// Size of the sibling group containing a node.
    pub fn set_size(&self, key: &K) -> Option<usize> {
        self.caches.set_size(key)
    }

    /// 1-based position of a node within its sibling group.
    pub fn position_in_set(&self, key: &K) -> Option<usize> {
        self.caches.position_in_set(key)
    }

    /// Check whether a node has children.
    pub fn is_expandable(&self, key: &K) -> bool {
        self.caches.is_expandable(key)
    }

    /// Every node of the latest pass in pre-order, regardless of expansion.
    pub fn flattened_nodes(&self) -> &[T] {
        &self.flattened
    }

    /// The current render list.
    pub fn render_nodes(&self) -> &[T] {
        &self.render
    }

    /// Roots of the latest committed pass.
    pub fn root_nodes(&self) -> &[T] {
        &self.roots
    }

    // -------------------------------------------------------------------------
    // Node views
    // -------------------------------------------------------------------------

    /// Register a materialized node view.
    ///
    /// The first registration latches the tree-wide render mode; later
    /// registrations with a different mode keep the latched one.
    pub fn register_node(&mut self, key: K, record: NodeRecord<K>) {
        match self.resolved_mode {
            None => {
                debug!("render mode resolved from the first node view");
                self.resolved_mode = Some(record.mode);
                self.layout_dirty = true;
            }
            Some(mode) if mode != record.mode => {
                debug!("node view mode differs from the latched render mode, keeping the latched one");
            }
            Some(_) => {}
        }
        self.registry.register(key, record);
    }

    /// Drop the record of a destroyed node view.
    pub fn unregister_node(&mut self, key: &K) {
        self.registry.unregister(key);
    }

    /// Live handle of a node view, if registered.
    pub fn handle_of(&self, key: &K) -> Option<Arc<dyn NodeHandle>> {
        self.registry.handle_of(key)
    }

    /// Live handle of a node's parent view.
    pub fn parent_handle_of(&self, key: &K) -> Option<Arc<dyn NodeHandle>> {
        let parent = self.caches.parent_of(key)?;
        self.registry.handle_of(&self.key_of(parent))
    }

    /// Live handles of a node's child views, in document order.
    pub fn child_handles_of(&self, key: &K) -> Vec<Arc<dyn NodeHandle>> {
        self.caches
            .children_of(key)
            .iter()
            .filter_map(|child| self.registry.handle_of(&self.key_of(child)))
            .collect()
    }

    /// Snapshot for the external keyboard navigator.
    pub fn key_manager(&self) -> KeyNavBridge<K> {
        let items = self
            .flattened
            .iter()
            .filter_map(|node| {
                let key = self.key_of(node);
                self.registry
                    .handle_of(&key)
                    .map(|handle| NavItem::new(key, handle))
            })
            .collect();
        KeyNavBridge::new(items, self.direction)
    }
}

impl<T, K> Drop for Tree<T, K> {
    fn drop(&mut self) {
        self.disconnect_source();
    }
}
