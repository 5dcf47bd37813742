//! Data sources and node structure accessors.
//!
//! A tree is fed root data through a [`DataSource`] and reads node structure
//! through exactly one of the accessors in [`NodeSource`]. Nested children
//! may resolve asynchronously via [`Children::Deferred`]; that future is the
//! only suspension point of a recomputation.

use std::future::Future;
use std::ops::Range;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt};
use tokio::sync::watch;

use crate::error::SourceError;

/// Key accessor: derives the stable expansion key of a node.
pub type KeyFn<T, K> = Arc<dyn Fn(&T) -> K + Send + Sync>;

/// Level accessor for pre-flattened input (0 = root).
pub type LevelFn<T> = Arc<dyn Fn(&T) -> usize + Send + Sync>;

/// Children accessor for nested input.
pub type ChildrenFn<T> = Arc<dyn Fn(&T) -> Children<T> + Send + Sync>;

/// Children of a nested node, available immediately or resolved later.
pub enum Children<T> {
    /// Children are available synchronously.
    Ready(Vec<T>),
    /// Children resolve through a future.
    Deferred(BoxFuture<'static, Result<Vec<T>, SourceError>>),
}

impl<T> Children<T> {
    /// Children available without suspension.
    pub fn ready(children: Vec<T>) -> Self {
        Self::Ready(children)
    }

    /// Children resolved by a future.
    pub fn deferred(
        fut: impl Future<Output = Result<Vec<T>, SourceError>> + Send + 'static,
    ) -> Self {
        Self::Deferred(fut.boxed())
    }

    /// No children.
    pub fn none() -> Self {
        Self::Ready(Vec::new())
    }
}

impl<T> From<Vec<T>> for Children<T> {
    fn from(children: Vec<T>) -> Self {
        Self::Ready(children)
    }
}

/// How node structure is read from the data.
///
/// Chosen once when the tree is built and immutable afterwards.
pub enum NodeSource<T> {
    /// Pre-flattened input with a level accessor.
    Flat(LevelFn<T>),
    /// Nested input with a children accessor.
    Nested(ChildrenFn<T>),
}

impl<T> NodeSource<T> {
    /// Check if the input representation is pre-flattened.
    pub fn is_flat(&self) -> bool {
        matches!(self, Self::Flat(_))
    }

    /// Check if the input representation is nested.
    pub fn is_nested(&self) -> bool {
        matches!(self, Self::Nested(_))
    }
}

/// Handle given to connectable sources describing what the tree renders.
///
/// Carries the currently materialized render range, updated after every
/// view sync. Sources backing a virtualized view can use it to fetch only
/// the rows the host is looking at.
#[derive(Debug, Clone)]
pub struct TreeViewer {
    view_change: watch::Receiver<Range<usize>>,
}

impl TreeViewer {
    pub(crate) fn new(view_change: watch::Receiver<Range<usize>>) -> Self {
        Self { view_change }
    }

    /// Subscribe to changes of the materialized render range.
    pub fn view_change(&self) -> watch::Receiver<Range<usize>> {
        self.view_change.clone()
    }

    /// The currently materialized render range.
    pub fn current_range(&self) -> Range<usize> {
        self.view_change.borrow().clone()
    }
}

/// A data source with an explicit connect/disconnect lifecycle.
///
/// Connected when the tree adopts the source, disconnected when the source
/// is swapped out or the tree is dropped.
pub trait ConnectableSource<T>: Send {
    /// Start producing root emissions for the given viewer.
    fn connect(&mut self, viewer: &TreeViewer) -> BoxStream<'static, Vec<T>>;

    /// Stop producing.
    fn disconnect(&mut self, viewer: &TreeViewer);
}

/// Root data fed into a tree.
pub enum DataSource<T> {
    /// A fixed root list emitted once.
    Static(Vec<T>),
    /// A push stream of root lists; each emission replaces the previous one.
    Stream(BoxStream<'static, Vec<T>>),
    /// A source connected on adoption and disconnected on swap.
    Connectable(Box<dyn ConnectableSource<T>>),
}

impl<T: Send + 'static> DataSource<T> {
    /// Wrap a fixed root list.
    pub fn from_items(items: Vec<T>) -> Self {
        Self::Static(items)
    }

    /// Wrap a stream of root lists.
    pub fn from_stream(stream: impl Stream<Item = Vec<T>> + Send + 'static) -> Self {
        Self::Stream(stream.boxed())
    }

    /// Wrap a connectable source.
    pub fn connectable(source: impl ConnectableSource<T> + 'static) -> Self {
        Self::Connectable(Box::new(source))
    }
}
