//! Error types for tree configuration and recomputation.

use thiserror::Error;

/// Error type for asynchronous children resolution failures.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SourceError {
    /// Error message
    pub message: String,
}

impl SourceError {
    /// Create a new source error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<String> for SourceError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for SourceError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Errors raised while configuring or recomputing a tree.
///
/// All variants except [`TreeError::Source`] are fatal: they indicate a
/// misconfigured tree or malformed input, not a transient condition.
#[derive(Debug, Clone, Error)]
pub enum TreeError {
    /// Zero or more than one node structure accessor was configured,
    /// or a required piece of configuration is missing.
    #[error("invalid tree configuration: {0}")]
    Configuration(String),

    /// No template matched a node that had to be materialized.
    #[error("no node template matches the node at render index {0}")]
    MissingNodeTemplate(usize),

    /// More than one template without a match predicate was registered.
    #[error("only one node template without a predicate is allowed")]
    AmbiguousDefaultTemplate,

    /// A registered node view is no longer reachable from any root.
    #[error("node view is detached from the tree: {0}")]
    StructuralIntegrity(String),

    /// Nested children revisited a node already walked in the same pass.
    #[error("cycle detected in nested tree data")]
    CycleDetected,

    /// Asynchronous children resolution failed.
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl TreeError {
    /// Creates a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a new structural integrity error.
    pub fn structural_integrity(message: impl Into<String>) -> Self {
        Self::StructuralIntegrity(message.into())
    }

    /// Returns `true` if this error came from a data source rather than
    /// from the tree itself.
    pub fn is_source(&self) -> bool {
        matches!(self, Self::Source(_))
    }
}
