//! Capsa Test - Shared test utilities for capsa crates.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! capsa-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use capsa_core::Capsule;
//! use capsa_test::{DestructorProbe, leak_test_value};
//!
//! #[test]
//! fn test_destroy_runs_destructor() {
//!     let probe = DestructorProbe::new();
//!     let capsule = Capsule::new(leak_test_value(7_u32).cast::<u32>(), Some("n"), Some(probe.destructor())).unwrap();
//!     capsule.destroy();
//!     assert_eq!(probe.count(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod probe;

pub use fixtures::*;
pub use probe::*;
