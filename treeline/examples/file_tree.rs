//! File tree example
//!
//! Drives the tree engine with an in-memory file tree:
//! - nested children resolution into a flattened render list
//! - expand/collapse operations changing visibility
//! - keyed view operations reaching a renderer

use std::fs::File;

use log::LevelFilter;
use simplelog::{Config, WriteLogger};
use treeline::prelude::*;

// =============================================================================
// File tree item
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
struct FileNode {
    /// Unique path (used as key)
    path: String,
    /// Display name
    name: String,
    /// Is this a directory?
    is_dir: bool,
    /// Child nodes (only for directories)
    children: Vec<FileNode>,
}

impl FileNode {
    fn file(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            is_dir: false,
            children: vec![],
        }
    }

    fn dir(path: impl Into<String>, name: impl Into<String>, children: Vec<FileNode>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            is_dir: true,
            children,
        }
    }
}

fn sample_tree() -> Vec<FileNode> {
    vec![
        FileNode::dir(
            "/src",
            "src",
            vec![
                FileNode::file("/src/main.rs", "main.rs"),
                FileNode::file("/src/lib.rs", "lib.rs"),
                FileNode::dir(
                    "/src/widgets",
                    "widgets",
                    vec![
                        FileNode::file("/src/widgets/mod.rs", "mod.rs"),
                        FileNode::file("/src/widgets/tree.rs", "tree.rs"),
                    ],
                ),
            ],
        ),
        FileNode::dir(
            "/docs",
            "docs",
            vec![
                FileNode::file("/docs/overview.md", "overview.md"),
                FileNode::file("/docs/architecture.md", "architecture.md"),
            ],
        ),
        FileNode::file("/Cargo.toml", "Cargo.toml"),
        FileNode::file("/README.md", "README.md"),
    ]
}

// =============================================================================
// Console renderer
// =============================================================================

/// Prints every view operation the tree issues.
struct ConsoleRenderer;

impl ViewRenderer<FileNode> for ConsoleRenderer {
    fn insert(&mut self, index: usize, template: TemplateId, data: &FileNode) {
        println!("  insert {index} [{template}] {}", data.path);
    }

    fn remove(&mut self, index: usize) {
        println!("  remove {index}");
    }

    fn move_node(&mut self, from: usize, to: usize) {
        println!("  move {from} -> {to}");
    }

    fn update(&mut self, _handle: &dyn NodeHandle, data: &FileNode) {
        println!("  update {}", data.path);
    }
}

fn print_render_list(tree: &Tree<FileNode, String>) {
    for node in tree.render_nodes() {
        let level = tree.level_of(&node.path).unwrap_or(0);
        let marker = if node.is_dir {
            if tree.is_expanded(node) { "v" } else { ">" }
        } else {
            " "
        };
        println!("{}{} {}", "  ".repeat(level), marker, node.name);
    }
}

#[tokio::main]
async fn main() -> Result<(), TreeError> {
    // Log the engine's decisions to a file for inspection.
    if let Ok(log_file) = File::create("file_tree.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, Config::default(), log_file);
    }

    let mut tree: Tree<FileNode, String> = Tree::builder()
        .keyed_by(|n: &FileNode| n.path.clone())
        .with_children_accessor(|n: &FileNode| Children::ready(n.children.clone()))
        .with_renderer(ConsoleRenderer)
        .build()?;

    tree.set_items(sample_tree());
    tree.flush().await?;

    println!("first paint:");
    tree.notify_painted()?;
    print_render_list(&tree);

    println!("\nexpand /src:");
    if let Some(src) = tree
        .flattened_nodes()
        .iter()
        .find(|n| n.path == "/src")
        .cloned()
    {
        tree.expand(&src);
    }
    tree.flush().await?;
    print_render_list(&tree);

    println!("\nexpand everything:");
    tree.expand_all();
    tree.flush().await?;
    print_render_list(&tree);

    println!("\ncollapse everything:");
    tree.collapse_all();
    tree.flush().await?;
    print_render_list(&tree);

    Ok(())
}
