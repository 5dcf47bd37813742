use treeline::prelude::*;

#[derive(Clone, Debug, PartialEq)]
struct Row {
    name: &'static str,
    level: usize,
}

fn row(name: &'static str, level: usize) -> Row {
    Row { name, level }
}

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

fn flat_tree() -> Tree<Row, &'static str> {
    Tree::builder()
        .keyed_by(|r: &Row| r.name)
        .with_level_accessor(|r: &Row| r.level)
        .with_renderer(NoopRenderer)
        .build()
        .unwrap()
}

fn nested_tree() -> Tree<Item, &'static str> {
    Tree::builder()
        .keyed_by(|i: &Item| i.name)
        .with_children_accessor(|i: &Item| Children::ready(i.children.clone()))
        .with_renderer(NoopRenderer)
        .build()
        .unwrap()
}

fn row_names(nodes: &[Row]) -> Vec<&'static str> {
    nodes.iter().map(|r| r.name).collect()
}

fn item_names(nodes: &[Item]) -> Vec<&'static str> {
    nodes.iter().map(|i| i.name).collect()
}

// ============================================================================
// Flat input
// ============================================================================

#[tokio::test]
async fn test_flat_levels_and_parents() {
    let mut tree = flat_tree();
    tree.set_items(vec![row("a", 0), row("b", 1), row("c", 1), row("d", 0)]);
    tree.flush().await.unwrap();

    assert_eq!(row_names(tree.flattened_nodes()), ["a", "b", "c", "d"]);
    assert_eq!(tree.level_of(&"a").unwrap(), 0);
    assert_eq!(tree.level_of(&"b").unwrap(), 1);
    assert_eq!(tree.parent_of(&"b").unwrap().name, "a");
    assert_eq!(tree.parent_of(&"c").unwrap().name, "a");
    assert_eq!(tree.parent_of(&"a"), None);
    assert_eq!(tree.parent_of(&"d"), None);
    assert!(tree.is_expandable(&"a"));
    assert!(!tree.is_expandable(&"b"));
}

#[tokio::test]
async fn test_sibling_groups() {
    let mut tree = flat_tree();
    tree.set_items(vec![row("a", 0), row("b", 1), row("c", 1), row("d", 0)]);
    tree.flush().await.unwrap();

    // Roots form one group, the children of "a" another.
    assert_eq!(tree.set_size(&"a"), Some(2));
    assert_eq!(tree.position_in_set(&"a"), Some(1));
    assert_eq!(tree.position_in_set(&"d"), Some(2));
    assert_eq!(tree.set_size(&"b"), Some(2));
    assert_eq!(tree.position_in_set(&"b"), Some(1));
    assert_eq!(tree.position_in_set(&"c"), Some(2));
    assert_eq!(row_names(&tree.children_of(&"a")), ["b", "c"]);
    assert_eq!(tree.set_size(&"missing"), None);
}

#[tokio::test]
async fn test_collapsed_children_hidden() {
    let mut tree = flat_tree();
    tree.set_items(vec![row("a", 0), row("b", 1), row("c", 1), row("d", 0)]);
    tree.flush().await.unwrap();

    assert_eq!(row_names(tree.render_nodes()), ["a", "d"]);

    tree.expand(&row("a", 0));
    tree.flush().await.unwrap();
    assert_eq!(row_names(tree.render_nodes()), ["a", "b", "c", "d"]);

    tree.collapse(&row("a", 0));
    tree.flush().await.unwrap();
    assert_eq!(row_names(tree.render_nodes()), ["a", "d"]);

    // The complete flattening is retained regardless of visibility.
    assert_eq!(row_names(tree.flattened_nodes()), ["a", "b", "c", "d"]);
}

#[tokio::test]
async fn test_visibility_requires_every_ancestor_expanded() {
    let mut tree = flat_tree();
    tree.set_items(vec![row("a", 0), row("b", 1), row("c", 2), row("d", 1)]);
    tree.flush().await.unwrap();

    tree.expand(&row("a", 0));
    tree.flush().await.unwrap();
    assert_eq!(row_names(tree.render_nodes()), ["a", "b", "d"]);

    tree.expand(&row("b", 1));
    tree.flush().await.unwrap();
    assert_eq!(row_names(tree.render_nodes()), ["a", "b", "c", "d"]);

    // Collapsing "a" hides the whole subtree even though "b" stays expanded.
    tree.collapse(&row("a", 0));
    tree.flush().await.unwrap();
    assert_eq!(row_names(tree.render_nodes()), ["a"]);

    tree.expand(&row("a", 0));
    tree.flush().await.unwrap();
    assert_eq!(row_names(tree.render_nodes()), ["a", "b", "c", "d"]);
}

#[tokio::test]
async fn test_level_jump_parents_to_nearest_shallower() {
    let mut tree = flat_tree();
    tree.set_items(vec![row("a", 0), row("c", 2)]);
    tree.flush().await.unwrap();

    assert_eq!(tree.parent_of(&"c").unwrap().name, "a");
    assert_eq!(tree.level_of(&"c").unwrap(), 2);

    tree.expand(&row("a", 0));
    tree.flush().await.unwrap();
    assert_eq!(row_names(tree.render_nodes()), ["a", "c"]);
}

#[tokio::test]
async fn test_expand_collapse_descendants() {
    let mut tree = flat_tree();
    tree.set_items(vec![
        row("a", 0),
        row("b", 1),
        row("c", 2),
        row("d", 1),
        row("e", 0),
    ]);
    tree.flush().await.unwrap();

    tree.expand_descendants(&row("a", 0));
    tree.flush().await.unwrap();
    assert_eq!(row_names(tree.render_nodes()), ["a", "b", "c", "d", "e"]);

    tree.collapse_descendants(&row("a", 0));
    tree.flush().await.unwrap();
    assert_eq!(row_names(tree.render_nodes()), ["a", "e"]);
    assert!(!tree.is_expanded(&row("b", 1)));
}

#[tokio::test]
async fn test_expand_all_collapse_all() {
    let mut tree = flat_tree();
    tree.set_items(vec![row("a", 0), row("b", 1), row("c", 2), row("d", 0)]);
    tree.flush().await.unwrap();

    tree.expand_all();
    tree.flush().await.unwrap();
    assert_eq!(row_names(tree.render_nodes()), ["a", "b", "c", "d"]);

    tree.collapse_all();
    tree.flush().await.unwrap();
    assert_eq!(row_names(tree.render_nodes()), ["a", "d"]);
    assert!(tree.expansion().is_empty());
}

#[tokio::test]
async fn test_empty_input() {
    let mut tree = flat_tree();
    tree.set_items(Vec::new());
    tree.flush().await.unwrap();

    assert!(tree.flattened_nodes().is_empty());
    assert!(tree.render_nodes().is_empty());
}

// ============================================================================
// Nested input
// ============================================================================

#[tokio::test]
async fn test_nested_flattening_order() {
    let mut tree = nested_tree();
    tree.set_items(vec![branch(
        "a",
        vec![branch("b", vec![leaf("d")]), leaf("c")],
    )]);
    tree.flush().await.unwrap();

    // Depth-first, parents before children, siblings in document order.
    assert_eq!(item_names(tree.flattened_nodes()), ["a", "b", "d", "c"]);
    assert_eq!(tree.level_of(&"a").unwrap(), 0);
    assert_eq!(tree.level_of(&"b").unwrap(), 1);
    assert_eq!(tree.level_of(&"d").unwrap(), 2);
    assert_eq!(tree.level_of(&"c").unwrap(), 1);
    assert_eq!(tree.parent_of(&"d").unwrap().name, "b");
    assert_eq!(item_names(tree.root_nodes()), ["a"]);
}

#[tokio::test]
async fn test_nested_expansion_filtering() {
    let mut tree = nested_tree();
    tree.set_items(vec![branch(
        "a",
        vec![branch("b", vec![leaf("d")]), leaf("c")],
    )]);
    tree.flush().await.unwrap();

    assert_eq!(item_names(tree.render_nodes()), ["a"]);

    tree.expand(&leaf("a"));
    tree.flush().await.unwrap();
    assert_eq!(item_names(tree.render_nodes()), ["a", "b", "c"]);

    tree.expand(&leaf("b"));
    tree.flush().await.unwrap();
    assert_eq!(item_names(tree.render_nodes()), ["a", "b", "d", "c"]);
}

#[tokio::test]
async fn test_nested_flattening_complete_while_collapsed() {
    let mut tree = nested_tree();
    tree.set_items(vec![
        branch("a", vec![leaf("b")]),
        branch("c", vec![leaf("d")]),
    ]);
    tree.flush().await.unwrap();

    // Children are resolved up front even though nothing is expanded.
    assert_eq!(item_names(tree.flattened_nodes()), ["a", "b", "c", "d"]);
    assert_eq!(item_names(tree.render_nodes()), ["a", "c"]);
}

#[tokio::test]
async fn test_deferred_children_resolved() {
    let mut tree: Tree<String, String> = Tree::builder()
        .self_keyed()
        .with_children_accessor(|n: &String| match n.as_str() {
            "a" => Children::deferred(async {
                Ok(vec!["b".to_string(), "c".to_string()])
            }),
            _ => Children::none(),
        })
        .with_renderer(NoopRenderer)
        .build()
        .unwrap();

    tree.set_items(vec!["a".to_string()]);
    tree.flush().await.unwrap();

    let names: Vec<&str> = tree.flattened_nodes().iter().map(|s| s.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
    assert_eq!(tree.level_of(&"b".to_string()).unwrap(), 1);
}

#[tokio::test]
async fn test_deferred_failure_propagates() {
    let mut tree: Tree<String, String> = Tree::builder()
        .self_keyed()
        .with_children_accessor(|n: &String| match n.as_str() {
            "a" => Children::deferred(async { Err(SourceError::new("backend offline")) }),
            _ => Children::none(),
        })
        .with_renderer(NoopRenderer)
        .build()
        .unwrap();

    tree.set_items(vec!["a".to_string()]);
    let err = tree.flush().await.unwrap_err();

    assert!(err.is_source());
    assert_eq!(err.to_string(), "backend offline");
}

#[tokio::test]
async fn test_cycle_detected() {
    let mut tree: Tree<String, String> = Tree::builder()
        .self_keyed()
        .with_children_accessor(|n: &String| match n.as_str() {
            "a" => Children::ready(vec!["b".to_string()]),
            "b" => Children::ready(vec!["a".to_string()]),
            _ => Children::none(),
        })
        .with_renderer(NoopRenderer)
        .build()
        .unwrap();

    tree.set_items(vec!["a".to_string()]);
    let err = tree.flush().await.unwrap_err();

    assert!(matches!(err, TreeError::CycleDetected));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_builder_rejects_missing_structure() {
    let err = Tree::<Row, &'static str>::builder()
        .keyed_by(|r: &Row| r.name)
        .with_renderer(NoopRenderer)
        .build()
        .err()
        .unwrap();

    assert!(matches!(err, TreeError::Configuration(_)));
    assert!(err.to_string().starts_with("invalid tree configuration"));
}

#[test]
fn test_builder_rejects_conflicting_structure() {
    let err = Tree::<Row, &'static str>::builder()
        .keyed_by(|r: &Row| r.name)
        .with_level_accessor(|r: &Row| r.level)
        .with_children_accessor(|_: &Row| Children::none())
        .with_renderer(NoopRenderer)
        .build()
        .err()
        .unwrap();

    assert!(matches!(err, TreeError::Configuration(_)));
}

#[test]
fn test_builder_rejects_control_next_to_accessor() {
    let err = Tree::<Row, &'static str>::builder()
        .keyed_by(|r: &Row| r.name)
        .with_level_accessor(|r: &Row| r.level)
        .with_control(TreeControl::flat(|r: &Row| r.level))
        .with_renderer(NoopRenderer)
        .build()
        .err()
        .unwrap();

    assert!(matches!(err, TreeError::Configuration(_)));
}

#[test]
fn test_builder_requires_key_accessor() {
    let err = Tree::<Row, &'static str>::builder()
        .with_level_accessor(|r: &Row| r.level)
        .with_renderer(NoopRenderer)
        .build()
        .err()
        .unwrap();

    assert!(matches!(err, TreeError::Configuration(_)));
}

#[test]
fn test_builder_requires_renderer() {
    let err = Tree::<Row, &'static str>::builder()
        .keyed_by(|r: &Row| r.name)
        .with_level_accessor(|r: &Row| r.level)
        .build()
        .err()
        .unwrap();

    assert!(matches!(err, TreeError::Configuration(_)));
}
