//! Capsa Gen - C header generator for capsule APIs.
//!
//! C sources mark exported functions with
//! `CAPSULE_API(KEY, return_type) name(args)`. For every module listed in a
//! manifest, the generator collects those declarations and writes:
//!
//! - an import header with one call-through macro per function, resolving
//!   to a slot in a table loaded from a capsule, and
//! - an export file with the slot initializer the exporting module builds
//!   its table from.
//!
//! Both name the table after its hash key (`<key>_<digest>`), so headers
//! generated from different declarations never bind to each other's tables.
//!
//! # Example
//!
//! ```rust,no_run
//! use capsa_gen::{Generator, Manifest};
//!
//! # fn main() -> Result<(), capsa_gen::GenError> {
//! let manifest = Manifest::load("capsules.json".as_ref())?;
//! for outcome in Generator::new(".").run(&manifest)? {
//!     println!("{outcome:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod emit;
mod error;
mod generate;
pub mod manifest;
mod parser;

pub use emit::{Rendered, RenderedApi, render};
pub use error::{GenError, GenResult};
pub use generate::{Generator, ModuleOutcome};
pub use manifest::{Manifest, ModuleSpec, ResolvedModule, expand};
pub use parser::ApiDeclarations;
