//! View-side contracts: renderers, templates, render modes.

mod differ;

pub(crate) use differ::ViewBridge;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::TreeError;
use crate::tree::NodeHandle;

/// How node views materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Views form one linear list; the tree filters it by expansion.
    Flat,
    /// Views nest inside their parent; the tree renders roots only and
    /// per-node views recurse through `children_of`.
    Nested,
}

/// Unique identifier for a registered node template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateId(usize);

impl TemplateId {
    fn new() -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "__template_{}", self.0)
    }
}

/// A node template with an optional match predicate.
///
/// Templates with a predicate are tried in registration order; the first
/// match wins. A template without a predicate is the default, used when no
/// predicate matches. At most one default may be registered.
pub struct NodeTemplate<T> {
    id: TemplateId,
    when: Option<Arc<dyn Fn(usize, &T) -> bool + Send + Sync>>,
}

impl<T> NodeTemplate<T> {
    /// Create the default template, matching any node.
    pub fn any() -> Self {
        Self {
            id: TemplateId::new(),
            when: None,
        }
    }

    /// Create a template matched by a predicate over (render index, node).
    pub fn when(predicate: impl Fn(usize, &T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            id: TemplateId::new(),
            when: Some(Arc::new(predicate)),
        }
    }

    /// Get the unique ID.
    pub fn id(&self) -> TemplateId {
        self.id
    }

    /// Check if this is the default template.
    pub fn is_default(&self) -> bool {
        self.when.is_none()
    }

    fn matches(&self, index: usize, node: &T) -> bool {
        match &self.when {
            Some(when) => (when.as_ref())(index, node),
            None => false,
        }
    }
}

/// Validated template collection.
pub(crate) struct TemplateSet<T> {
    templates: Vec<NodeTemplate<T>>,
}

impl<T> TemplateSet<T> {
    /// Validate a template collection.
    ///
    /// More than one default template is rejected here; a missing match is
    /// only detected later, when a node actually has to be materialized.
    pub fn new(templates: Vec<NodeTemplate<T>>) -> Result<Self, TreeError> {
        let defaults = templates.iter().filter(|t| t.is_default()).count();
        if defaults > 1 {
            return Err(TreeError::AmbiguousDefaultTemplate);
        }
        Ok(Self { templates })
    }

    /// Pick the template for a node at a render index.
    pub fn resolve(&self, index: usize, node: &T) -> Result<TemplateId, TreeError> {
        self.templates
            .iter()
            .find(|t| t.matches(index, node))
            .or_else(|| self.templates.iter().find(|t| t.is_default()))
            .map(NodeTemplate::id)
            .ok_or(TreeError::MissingNodeTemplate(index))
    }
}

/// Receives keyed diff operations that materialize the render list.
///
/// Implemented by the host. The tree guarantees ops arrive in a valid
/// order: removals at descending indices first, then inserts and moves
/// walking target positions upward, then data updates.
pub trait ViewRenderer<T>: Send {
    /// Materialize a node view at `index` using `template`.
    fn insert(&mut self, index: usize, template: TemplateId, data: &T);

    /// Destroy the view at `index`.
    fn remove(&mut self, index: usize);

    /// Move an existing view between indices.
    fn move_node(&mut self, from: usize, to: usize);

    /// Refresh a live view whose backing data changed in place.
    fn update(&mut self, handle: &dyn NodeHandle, data: &T);
}
