//! Capsa API - Function tables exported and imported through capsules.
//!
//! A module publishes a set of C-callable functions as an [`ApiTable`]. The
//! table is published through a capsule whose name is the table's hash key,
//! `<key>_<digest>`, where the digest covers every exported signature in
//! order. Consumers hold an [`ApiImport`] bound to the hash key they were
//! built against; it resolves once through a [`CapsuleSource`] and then hands
//! out function slots by index or name.
//!
//! Because the signatures are part of the capsule name, a consumer built
//! against an older table never finds (and never calls into) a newer one.
//!
//! # Example
//!
//! ```
//! use capsa_api::{ApiExports, ApiImport, ApiKey, ApiSignature, ApiTable};
//!
//! extern "C" fn add(a: i32, b: i32) -> i32 {
//!     a + b
//! }
//!
//! let key = ApiKey::new("math_api").unwrap();
//! let signatures = vec![ApiSignature::new("add", "int", ["int a", "int b"])];
//!
//! // Exporting side.
//! let exports = ApiExports::new("math");
//! let table = ApiTable::builder(key.clone())
//!     .function(signatures[0].clone(), add as *const ())
//!     .build()
//!     .unwrap();
//! exports.export(table).unwrap();
//!
//! // Importing side.
//! let import = ApiImport::for_signatures(&key, &signatures);
//! import.load(&exports).unwrap();
//! let add: extern "C" fn(i32, i32) -> i32 = unsafe { import.get(0).unwrap().cast() };
//! assert_eq!(add(2, 2), 4);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod exports;
mod import;
mod key;
mod signature;
mod table;

pub use error::{ApiError, ApiResult};
pub use exports::{ApiExports, CapsuleSource};
pub use import::ApiImport;
pub use key::ApiKey;
pub use signature::{ApiDigest, ApiSignature, STATE_ARG, hash_key};
pub use table::{ApiSlot, ApiTable, ApiTableBuilder, ExportedApi};
