//! Prelude module - commonly used types for convenient import.
//!
//! Use `use capsa_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{CapsuleError, CapsuleResult};

// Capsule and its parts
pub use crate::{Capsule, CapsuleName, CapsulePtr, Destructor};
