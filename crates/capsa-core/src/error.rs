//! Capsule error types.

use thiserror::Error;

/// Errors that can occur when creating or accessing a capsule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapsuleError {
    /// A null pointer (or otherwise unusable argument) was supplied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The name presented at access does not match the capsule's tag.
    #[error("capsule type mismatch: expected {}, found {}", display_tag(.expected), display_tag(.actual))]
    TypeMismatch {
        /// The name presented by the caller.
        expected: Option<String>,
        /// The name stored in the capsule.
        actual: Option<String>,
    },

    /// The capsule has already been destroyed.
    #[error("capsule has been destroyed")]
    Invalidated,
}

fn display_tag(tag: &Option<String>) -> String {
    match tag {
        Some(name) => format!("{name:?}"),
        None => "<unnamed>".to_string(),
    }
}

impl CapsuleError {
    pub(crate) fn null_pointer(what: &str) -> Self {
        Self::InvalidArgument(format!("{what} must not be null"))
    }
}

/// Result type for capsule operations.
pub type CapsuleResult<T> = Result<T, CapsuleError>;
