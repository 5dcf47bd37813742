use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use treeline::prelude::*;

#[derive(Clone, Debug, PartialEq)]
struct Item {
    name: &'static str,
    children: Vec<Item>,
}

fn leaf(name: &'static str) -> Item {
    Item {
        name,
        children: Vec::new(),
    }
}

fn branch(name: &'static str, children: Vec<Item>) -> Item {
    Item { name, children }
}

struct NoopRenderer;

impl<T> ViewRenderer<T> for NoopRenderer {
    fn insert(&mut self, _index: usize, _template: TemplateId, _data: &T) {}
    fn remove(&mut self, _index: usize) {}
    fn move_node(&mut self, _from: usize, _to: usize) {}
    fn update(&mut self, _handle: &dyn NodeHandle, _data: &T) {}
}

fn names(nodes: &[Item]) -> Vec<&'static str> {
    nodes.iter().map(|i| i.name).collect()
}

// ============================================================================
// Model semantics
// ============================================================================

#[test]
fn test_expand_collapse_deltas() {
    let model: ExpansionModel<&'static str> = ExpansionModel::new();

    assert_eq!(model.expand("a"), (vec!["a"], vec![]));
    assert_eq!(model.expand("a"), (vec![], vec![]));
    assert!(model.is_expanded(&"a"));
    assert_eq!(model.len(), 1);

    assert_eq!(model.collapse(&"a"), (vec![], vec!["a"]));
    assert_eq!(model.collapse(&"a"), (vec![], vec![]));
    assert!(model.is_empty());
}

#[test]
fn test_toggle() {
    let model: ExpansionModel<&'static str> = ExpansionModel::new();

    assert_eq!(model.toggle("a"), (vec!["a"], vec![]));
    assert!(model.is_expanded(&"a"));
    assert_eq!(model.toggle("a"), (vec![], vec!["a"]));
    assert!(!model.is_expanded(&"a"));
}

#[test]
fn test_idempotent_operations_emit_nothing() {
    let model: ExpansionModel<&'static str> = ExpansionModel::new();
    let mut rx = model.changed();

    model.expand("a");
    let change = rx.try_recv().unwrap();
    assert_eq!(change.added, ["a"]);
    assert!(change.removed.is_empty());

    // A second expand of the same key is a no-op.
    model.expand("a");
    assert!(rx.try_recv().is_err());

    // So is collapsing a key that was never expanded.
    model.collapse(&"b");
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_batch_emits_single_event() {
    let model: ExpansionModel<&'static str> = ExpansionModel::new();
    model.expand("b");
    let mut rx = model.changed();

    let added = model.expand_many(["a", "b", "c"]);
    assert_eq!(added, ["a", "c"]);

    let change = rx.try_recv().unwrap();
    assert_eq!(change.added, ["a", "c"]);
    assert!(rx.try_recv().is_err());

    let removed = model.collapse_many(["a", "b", "z"]);
    assert_eq!(removed, ["a", "b"]);

    let change = rx.try_recv().unwrap();
    assert_eq!(change.removed, ["a", "b"]);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_clear_reports_all_removed() {
    let model: ExpansionModel<&'static str> = ExpansionModel::new();
    model.expand_many(["a", "b"]);
    let mut rx = model.changed();

    let mut removed = model.clear();
    removed.sort_unstable();
    assert_eq!(removed, ["a", "b"]);
    assert!(model.is_empty());

    let mut change = rx.try_recv().unwrap();
    change.removed.sort_unstable();
    assert_eq!(change.removed, ["a", "b"]);

    // Clearing an empty model emits nothing.
    assert!(model.clear().is_empty());
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_clones_share_state() {
    let model: ExpansionModel<&'static str> = ExpansionModel::new();
    let shared = model.clone();

    shared.expand("a");
    assert!(model.is_expanded(&"a"));

    model.collapse(&"a");
    assert!(!shared.is_expanded(&"a"));
}

#[test]
fn test_expanded_keys_snapshot() {
    let model: ExpansionModel<i32> = ExpansionModel::new();
    model.expand_many([3, 1, 2]);

    let mut keys = model.expanded_keys();
    keys.sort_unstable();
    assert_eq!(keys, [1, 2, 3]);
}

// ============================================================================
// Tree integration
// ============================================================================

#[tokio::test]
async fn test_control_shares_expansion_model() {
    let control = TreeControl::nested(|i: &Item| Children::ready(i.children.clone()));
    let model = control.expansion().clone();

    let mut tree: Tree<Item, &'static str> = Tree::builder()
        .keyed_by(|i: &Item| i.name)
        .with_control(control)
        .with_renderer(NoopRenderer)
        .build()
        .unwrap();

    tree.set_items(vec![branch("a", vec![leaf("b")])]);
    tree.flush().await.unwrap();
    assert_eq!(names(tree.render_nodes()), ["a"]);

    // Expanding through the external model drives the tree.
    model.expand("a");
    tree.flush().await.unwrap();
    assert_eq!(names(tree.render_nodes()), ["a", "b"]);

    // And tree-side changes are visible to the external model.
    tree.collapse(&leaf("a"));
    assert!(!model.is_expanded(&"a"));
}

#[tokio::test]
async fn test_external_model_adopted() {
    let model: ExpansionModel<&'static str> = ExpansionModel::new();
    model.expand("a");

    let mut tree: Tree<Item, &'static str> = Tree::builder()
        .keyed_by(|i: &Item| i.name)
        .with_children_accessor(|i: &Item| Children::ready(i.children.clone()))
        .with_expansion_model(model.clone())
        .with_renderer(NoopRenderer)
        .build()
        .unwrap();

    tree.set_items(vec![branch("a", vec![leaf("b")])]);
    tree.flush().await.unwrap();

    // Expanded before build; the first pass renders it open.
    assert_eq!(names(tree.render_nodes()), ["a", "b"]);
}

#[tokio::test]
async fn test_expansion_does_not_refetch_children() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();

    let mut tree: Tree<Item, &'static str> = Tree::builder()
        .keyed_by(|i: &Item| i.name)
        .with_children_accessor(move |i: &Item| {
            seen.fetch_add(1, Ordering::SeqCst);
            Children::ready(i.children.clone())
        })
        .with_renderer(NoopRenderer)
        .build()
        .unwrap();

    tree.set_items(vec![branch("a", vec![branch("b", vec![leaf("c")])])]);
    tree.flush().await.unwrap();
    let after_load = calls.load(Ordering::SeqCst);
    assert_eq!(after_load, 3);

    tree.expand(&leaf("a"));
    tree.flush().await.unwrap();
    tree.collapse(&leaf("a"));
    tree.flush().await.unwrap();
    tree.expand(&leaf("a"));
    tree.flush().await.unwrap();

    // Visibility changes reuse the cached flattening.
    assert_eq!(calls.load(Ordering::SeqCst), after_load);
}
