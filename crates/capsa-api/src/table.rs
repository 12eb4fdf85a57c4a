//! Function tables published through capsules.

use std::collections::HashSet;
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use capsa_core::Capsule;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::key::ApiKey;
use crate::signature::{ApiSignature, hash_key};

/// A type-erased function pointer stored in an API table.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ApiSlot(NonNull<()>);

// SAFETY: slots hold code addresses, which are valid on every thread.
#[allow(unsafe_code)]
unsafe impl Send for ApiSlot {}
#[allow(unsafe_code)]
unsafe impl Sync for ApiSlot {}

impl ApiSlot {
    /// Erase a function pointer, e.g. `ApiSlot::new(my_fn as *const ())`.
    ///
    /// Returns `None` for a null pointer.
    #[must_use]
    pub fn new(function: *const ()) -> Option<Self> {
        NonNull::new(function.cast_mut()).map(Self)
    }

    /// The erased pointer.
    #[must_use]
    pub fn as_ptr(self) -> *const () {
        self.0.as_ptr().cast_const()
    }

    /// Recover the typed function pointer.
    ///
    /// # Safety
    ///
    /// `F` must be the exact function pointer type that was erased into this
    /// slot.
    #[allow(unsafe_code)]
    #[must_use]
    pub unsafe fn cast<F: Copy>(self) -> F {
        debug_assert_eq!(size_of::<F>(), size_of::<*const ()>());
        // SAFETY: guaranteed by the caller.
        unsafe { std::mem::transmute_copy(&self.0) }
    }
}

impl fmt::Debug for ApiSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiSlot({:p})", self.0)
    }
}

/// An ordered table of exported functions for one API key.
///
/// Slot indexes are positions in declaration order; importers address
/// functions by index the way generated C headers use `<NAME>_ID` constants.
#[derive(Debug)]
pub struct ApiTable {
    key: ApiKey,
    hash_key: String,
    signatures: Vec<ApiSignature>,
    slots: Vec<ApiSlot>,
}

impl ApiTable {
    /// Start building a table for `key`.
    #[must_use]
    pub fn builder(key: ApiKey) -> ApiTableBuilder {
        ApiTableBuilder {
            key,
            entries: Vec::new(),
        }
    }

    /// The API key.
    #[must_use]
    pub fn key(&self) -> &ApiKey {
        &self.key
    }

    /// The capsule name the table is published under.
    #[must_use]
    pub fn hash_key(&self) -> &str {
        &self.hash_key
    }

    /// Declared signatures in slot order.
    #[must_use]
    pub fn signatures(&self) -> &[ApiSignature] {
        &self.signatures
    }

    /// Number of functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the table has no functions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The function at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SlotOutOfRange`] past the end of the table.
    pub fn slot(&self, index: usize) -> ApiResult<ApiSlot> {
        self.slots.get(index).copied().ok_or(ApiError::SlotOutOfRange {
            index,
            len: self.slots.len(),
        })
    }

    /// Slot index of the function called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UnknownFunction`] if no function has that name.
    pub fn index_of(&self, name: &str) -> ApiResult<usize> {
        self.signatures
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| ApiError::UnknownFunction {
                hash_key: self.hash_key.clone(),
                name: name.to_string(),
            })
    }

    /// Publish the table as a capsule named with its hash key.
    ///
    /// The capsule holds a reference to the table, released when the capsule
    /// is destroyed.
    ///
    /// # Errors
    ///
    /// Propagates capsule creation errors.
    pub fn export(self) -> ApiResult<ExportedApi> {
        debug!(hash_key = %self.hash_key, functions = self.len(), "Exporting API table");
        let table = Arc::new(self);
        let capsule = Capsule::from_box(Box::new(Arc::clone(&table)), Some(&table.hash_key))?;
        Ok(ExportedApi {
            table,
            capsule: Arc::new(capsule),
        })
    }
}

/// A table published by [`ApiTable::export`], paired with its capsule.
///
/// Only `export` can build one, so a source handing these out cannot pass
/// off an arbitrary capsule as a table. Importers read the table through
/// the pair and use the capsule for its name and lifetime: once the capsule
/// is destroyed, the table is no longer reachable through it.
#[derive(Debug, Clone)]
pub struct ExportedApi {
    table: Arc<ApiTable>,
    capsule: Arc<Capsule>,
}

impl ExportedApi {
    /// The capsule to hand to hosts.
    #[must_use]
    pub fn capsule(&self) -> &Arc<Capsule> {
        &self.capsule
    }

    /// The hash key the table was published under.
    #[must_use]
    pub fn hash_key(&self) -> &str {
        self.table.hash_key()
    }

    /// Run `f` against the table if the capsule is still live and named
    /// `expected`. A concurrent destroy waits until `f` returns.
    pub(crate) fn with_table<R>(
        &self,
        expected: &str,
        f: impl FnOnce(&ApiTable) -> R,
    ) -> ApiResult<R> {
        Ok(self
            .capsule
            .with_pointer(Some(expected), |_| f(&self.table))?)
    }
}

/// Builder for [`ApiTable`].
#[derive(Debug)]
pub struct ApiTableBuilder {
    key: ApiKey,
    entries: Vec<(ApiSignature, Option<ApiSlot>)>,
}

impl ApiTableBuilder {
    /// Append a function. `function` is an erased function pointer.
    #[must_use]
    pub fn function(mut self, signature: ApiSignature, function: *const ()) -> Self {
        self.entries.push((signature, ApiSlot::new(function)));
        self
    }

    /// Finish the table.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::DuplicateFunction`] if a name repeats, or
    /// [`ApiError::Capsule`] with an invalid-argument error for a null
    /// function pointer.
    pub fn build(self) -> ApiResult<ApiTable> {
        let mut seen = HashSet::new();
        let mut signatures = Vec::with_capacity(self.entries.len());
        let mut slots = Vec::with_capacity(self.entries.len());

        for (signature, slot) in self.entries {
            if !seen.insert(signature.name.clone()) {
                return Err(ApiError::DuplicateFunction {
                    key: self.key.to_string(),
                    name: signature.name,
                });
            }
            let slot = slot.ok_or_else(|| {
                capsa_core::CapsuleError::InvalidArgument(format!(
                    "function pointer for {} must not be null",
                    signature.name
                ))
            })?;
            signatures.push(signature);
            slots.push(slot);
        }

        Ok(ApiTable {
            hash_key: hash_key(&self.key, &signatures),
            key: self.key,
            signatures,
            slots,
        })
    }
}
