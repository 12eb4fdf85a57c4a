//! API table error types.

use capsa_core::CapsuleError;
use thiserror::Error;

/// Errors raised while exporting or importing API tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The underlying capsule rejected the access.
    #[error(transparent)]
    Capsule(#[from] CapsuleError),

    /// API keys must match `[a-zA-Z_][a-zA-Z0-9_]+`.
    #[error("invalid API key: {0:?}")]
    InvalidKey(String),

    /// A table declared the same function twice.
    #[error("function {name} declared twice in API {key}")]
    DuplicateFunction {
        /// The API key.
        key: String,
        /// The repeated function name.
        name: String,
    },

    /// No capsule is exported under the hash key.
    #[error("API {hash_key} is not exported")]
    NotExported {
        /// The hash key looked up.
        hash_key: String,
    },

    /// A capsule is already exported under the hash key.
    #[error("API {hash_key} is already exported")]
    AlreadyExported {
        /// The conflicting hash key.
        hash_key: String,
    },

    /// The import slot has not been loaded yet.
    #[error("API {hash_key} has not been loaded")]
    NotLoaded {
        /// The hash key of the import.
        hash_key: String,
    },

    /// The requested slot index is past the end of the table.
    #[error("slot {index} out of range for table of {len} functions")]
    SlotOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of functions in the table.
        len: usize,
    },

    /// The table does not export a function with that name.
    #[error("API {hash_key} has no function named {name}")]
    UnknownFunction {
        /// The hash key of the table.
        hash_key: String,
        /// The missing function name.
        name: String,
    },
}

/// Result type for API table operations.
pub type ApiResult<T> = Result<T, ApiError>;
