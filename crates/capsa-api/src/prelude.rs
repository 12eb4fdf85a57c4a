//! Prelude module - commonly used types for convenient import.
//!
//! Use `use capsa_api::prelude::*;` to import all essential types.

// Errors
pub use crate::{ApiError, ApiResult};

// Declarations
pub use crate::{ApiDigest, ApiKey, ApiSignature};

// Tables, exports and imports
pub use crate::{ApiExports, ApiImport, ApiSlot, ApiTable, CapsuleSource, ExportedApi};
