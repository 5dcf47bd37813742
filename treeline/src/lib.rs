//! Tree flattening and rendering engine
//!
//! Converts hierarchical data into an ordered render list, tracks expansion
//! state, and drives a host renderer through keyed diffs.

pub mod error;
pub mod expansion;
pub mod keynav;
pub mod source;
pub mod tree;
pub mod view;

pub use tree::Tree;

pub mod prelude {
    pub use crate::error::{SourceError, TreeError};
    pub use crate::expansion::{ExpansionChange, ExpansionModel};
    pub use crate::keynav::{KeyNavBridge, NavItem, TextDirection};
    pub use crate::source::{Children, ConnectableSource, DataSource, NodeSource, TreeViewer};
    pub use crate::tree::{NodeHandle, NodeRecord, Tree, TreeBuilder, TreeControl};
    pub use crate::view::{NodeTemplate, RenderMode, TemplateId, ViewRenderer};
}
