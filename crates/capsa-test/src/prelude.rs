//! Prelude module - commonly used test helpers.
//!
//! Use `use capsa_test::prelude::*;` in test modules.

pub use crate::{DestructorCall, DestructorProbe, init_test_logging, leak_test_value};
