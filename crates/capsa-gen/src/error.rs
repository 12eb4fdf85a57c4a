//! Generator error types.

use std::path::PathBuf;

use capsa_api::ApiError;
use thiserror::Error;

/// Errors raised while reading manifests, parsing sources or writing output.
#[derive(Debug, Error)]
pub enum GenError {
    /// The manifest could not be parsed.
    #[error("failed to parse manifest at {path}: {message}")]
    ManifestParse {
        /// Manifest path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A module directory listed in the manifest does not exist.
    #[error("module directory not found: {0}")]
    ModuleNotFound(PathBuf),

    /// A required option resolved to an empty list.
    #[error("`{option}` must be specified for module {module}")]
    MissingOption {
        /// The option name.
        option: &'static str,
        /// The module being generated.
        module: String,
    },

    /// A template referenced a placeholder other than `{module}` or `{path}`.
    #[error("unknown placeholder {{{placeholder}}} in {template:?}")]
    UnknownPlaceholder {
        /// The placeholder name.
        placeholder: String,
        /// The template it appeared in.
        template: String,
    },

    /// A template has an unbalanced brace.
    #[error("unbalanced brace in {0:?}")]
    UnbalancedBrace(String),

    /// A `CAPSULE_API` key is not a valid identifier.
    #[error("invalid key {key:?} in declaration {declaration:?}")]
    InvalidKey {
        /// The key as written.
        key: String,
        /// The declaration it belongs to.
        declaration: String,
    },

    /// A `CAPSULE_API` declaration is not `name(args)`.
    #[error("invalid declaration for key {key}: {declaration:?}")]
    InvalidDeclaration {
        /// The key the declaration was tagged with.
        key: String,
        /// The declaration as written.
        declaration: String,
    },

    /// Building the API description failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Reading or writing a file failed.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
}

impl GenError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// Result type for generator operations.
pub type GenResult<T> = Result<T, GenError>;
