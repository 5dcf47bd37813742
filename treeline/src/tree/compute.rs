//! Flattening passes that rebuild the caches from root data.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

use futures::StreamExt;
use futures::stream::BoxStream;
use log::debug;

use crate::error::TreeError;
use crate::source::{Children, ChildrenFn, KeyFn, LevelFn};
use crate::tree::cache::TreeCaches;

/// Output of a completed flattening pass.
pub(crate) struct Flattening<T, K> {
    /// Every node in pre-order, regardless of expansion state.
    pub flattened: Vec<T>,
    /// Caches rebuilt by the same pass.
    pub caches: TreeCaches<T, K>,
}

/// Outcome of a recomputation that may race the data stream.
pub(crate) enum ComputeOutcome<T, K> {
    /// The pass ran to completion.
    Done(Flattening<T, K>),
    /// A newer root emission arrived; the partial pass is discarded.
    Superseded(Vec<T>),
}

/// Build caches for pre-flattened input in one forward pass.
///
/// The parent of a node is the nearest preceding node with a smaller level;
/// a node with no such predecessor is a root. The ancestor stack keeps the
/// whole pass linear in the number of nodes.
pub(crate) fn compute_flat<T, K>(
    nodes: Vec<T>,
    level_fn: LevelFn<T>,
    key_fn: KeyFn<T, K>,
) -> Flattening<T, K>
where
    T: Clone,
    K: Clone + Eq + Hash,
{
    let mut caches = TreeCaches::new(key_fn);
    // (index into nodes, level) for the current ancestor chain
    let mut ancestors: Vec<(usize, usize)> = Vec::new();

    for index in 0..nodes.len() {
        let level = (level_fn)(&nodes[index]);
        while ancestors.last().is_some_and(|&(_, l)| l >= level) {
            ancestors.pop();
        }
        let parent = ancestors.last().map(|&(i, _)| &nodes[i]);
        caches.record(&nodes[index], level, parent);
        ancestors.push((index, level));
    }

    Flattening {
        flattened: nodes,
        caches,
    }
}

/// Build the flattened list and caches for nested input.
///
/// Iterative pre-order walk with an explicit frame stack: a node's entire
/// subtree is emitted before its next sibling, even when children resolve
/// through futures. While awaiting children the pass races the active data
/// stream; a newer root emission supersedes this pass before any state is
/// shared. A key seen twice in the same pass aborts it with
/// [`TreeError::CycleDetected`].
pub(crate) async fn compute_nested<T, K>(
    roots: Vec<T>,
    children_fn: ChildrenFn<T>,
    key_fn: KeyFn<T, K>,
    source: &mut Option<BoxStream<'static, Vec<T>>>,
) -> Result<ComputeOutcome<T, K>, TreeError>
where
    T: Clone + Send,
    K: Clone + Eq + Hash + Send,
{
    struct Frame<T> {
        pending: VecDeque<T>,
        level: usize,
        parent: Option<T>,
    }

    let mut caches = TreeCaches::new(key_fn.clone());
    let mut flattened = Vec::new();
    let mut visited: HashSet<K> = HashSet::new();
    let mut stack = vec![Frame {
        pending: roots.into(),
        level: 0,
        parent: None,
    }];

    while let Some(frame) = stack.last_mut() {
        let Some(node) = frame.pending.pop_front() else {
            stack.pop();
            continue;
        };
        let key = (key_fn)(&node);
        if !visited.insert(key) {
            debug!("nested walk revisited a key, aborting recompute");
            return Err(TreeError::CycleDetected);
        }
        let level = frame.level;
        let parent = frame.parent.clone();
        caches.record(&node, level, parent.as_ref());
        flattened.push(node.clone());

        let children = match (children_fn)(&node) {
            Children::Ready(children) => children,
            Children::Deferred(mut fut) => loop {
                match source.take() {
                    Some(mut stream) => {
                        tokio::select! {
                            biased;
                            emitted = stream.next() => match emitted {
                                Some(items) => {
                                    debug!("newer root emission superseded an in-flight recompute");
                                    *source = Some(stream);
                                    return Ok(ComputeOutcome::Superseded(items));
                                }
                                // Stream ended; keep resolving without the race.
                                None => {}
                            },
                            resolved = &mut fut => {
                                *source = Some(stream);
                                break resolved?;
                            }
                        }
                    }
                    None => break fut.await?,
                }
            },
        };

        if !children.is_empty() {
            stack.push(Frame {
                pending: children.into(),
                level: level + 1,
                parent: Some(node),
            });
        }
    }

    Ok(ComputeOutcome::Done(Flattening { flattened, caches }))
}

/// Nodes whose entire ancestor chain is expanded, in flattened order.
///
/// Works purely from the committed flattened list and level cache, so it
/// never invokes a structure accessor.
pub(crate) fn filter_visible<T, K>(
    flattened: &[T],
    caches: &TreeCaches<T, K>,
    expanded: &HashSet<K>,
) -> Vec<T>
where
    T: Clone,
    K: Clone + Eq + Hash,
{
    // (level, children shown) for the current ancestor chain
    let mut ancestors: Vec<(usize, bool)> = Vec::new();
    let mut visible = Vec::new();

    for node in flattened {
        let key = caches.key_of(node);
        let level = caches.level_of(&key).unwrap_or(0);
        while ancestors.last().is_some_and(|&(l, _)| l >= level) {
            ancestors.pop();
        }
        let shown = ancestors.last().map(|&(_, v)| v).unwrap_or(true);
        if shown {
            visible.push(node.clone());
        }
        ancestors.push((level, shown && expanded.contains(&key)));
    }

    visible
}
