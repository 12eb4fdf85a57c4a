//! Capsa Core - Type-tagged, destructible opaque handles.
//!
//! A [`Capsule`] smuggles a native pointer across a language or module
//! boundary while keeping two guarantees:
//! - Type safety: the capsule carries a name tag, and the pointer is only
//!   handed out to callers presenting the same name.
//! - Deterministic cleanup: an optional [`Destructor`] runs exactly once,
//!   when the capsule is destroyed or dropped.
//!
//! The capsule never dereferences or frees the pointer itself. The destructor
//! supplied by the creator owns that job.
//!
//! # Example
//!
//! ```
//! use capsa_core::{Capsule, CapsuleError, Destructor};
//!
//! let raw = Box::into_raw(Box::new(vec![1_u8, 2, 3]));
//! let capsule = Capsule::new(
//!     raw,
//!     Some("bytes"),
//!     Some(Destructor::new(|pointer, _name, _context| {
//!         // SAFETY: the capsule was created from `Box::into_raw` above.
//!         drop(unsafe { Box::from_raw(pointer.cast::<Vec<u8>>()) });
//!     })),
//! )
//! .unwrap();
//!
//! assert_eq!(capsule.pointer(Some("bytes")).unwrap().cast::<Vec<u8>>(), raw);
//! assert!(matches!(
//!     capsule.pointer(None),
//!     Err(CapsuleError::TypeMismatch { .. })
//! ));
//!
//! // Runs the destructor; the capsule is unusable afterwards.
//! capsule.destroy();
//! assert!(!capsule.is_valid(Some("bytes")));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod ffi;
pub mod prelude;

mod capsule;
mod destructor;
mod error;
mod name;
mod ptr;

pub use capsule::Capsule;
pub use destructor::Destructor;
pub use error::{CapsuleError, CapsuleResult};
pub use name::CapsuleName;
pub use ptr::CapsulePtr;
