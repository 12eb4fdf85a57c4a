//! The capsule record and its lifecycle.

use std::fmt;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::destructor::Destructor;
use crate::error::{CapsuleError, CapsuleResult};
use crate::name::{CapsuleName, tags_match};
use crate::ptr::CapsulePtr;

/// Mutable half of a live capsule.
struct Slots {
    pointer: CapsulePtr,
    context: Option<CapsulePtr>,
    destructor: Option<Destructor>,
}

enum State {
    Live(Slots),
    Destroyed,
}

/// An opaque, type-tagged handle around a native pointer.
///
/// A capsule carries a non-null pointer it never dereferences, an optional
/// side-channel context pointer, an immutable name used to check that callers
/// know what the pointer is, and an optional [`Destructor`].
///
/// Every read and write goes through one mutex per capsule. [`Capsule::destroy`]
/// swaps the state to destroyed under that lock before running the destructor,
/// so no operation that starts afterwards can see the old pointer. Dropping a
/// capsule destroys it, which is how `Arc<Capsule>` releases the resource when
/// the last reference goes away.
///
/// # Example
///
/// ```
/// use capsa_core::{Capsule, CapsuleError};
///
/// let capsule = Capsule::from_box(Box::new([0_u8; 64]), Some("buffer")).unwrap();
///
/// assert!(capsule.pointer(Some("buffer")).is_ok());
/// assert!(matches!(
///     capsule.pointer(Some("other")),
///     Err(CapsuleError::TypeMismatch { .. })
/// ));
///
/// assert!(capsule.destroy());
/// assert_eq!(capsule.pointer(Some("buffer")), Err(CapsuleError::Invalidated));
/// ```
pub struct Capsule {
    name: Option<CapsuleName>,
    state: Mutex<State>,
}

impl Capsule {
    /// Create a capsule around `pointer`.
    ///
    /// The name is copied into the capsule. If creation fails the destructor
    /// is dropped without being called.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::InvalidArgument`] if `pointer` is null or the
    /// name contains a NUL byte.
    pub fn new<T>(
        pointer: *mut T,
        name: Option<&str>,
        destructor: Option<Destructor>,
    ) -> CapsuleResult<Self> {
        let pointer =
            CapsulePtr::new(pointer).ok_or_else(|| CapsuleError::null_pointer("pointer"))?;
        let name = name.map(CapsuleName::new).transpose()?;
        Ok(Self::from_parts(pointer, name, destructor))
    }

    /// Create a capsule that owns `value`; destroying the capsule drops it.
    ///
    /// The box is reclaimed from its original address even if the pointer
    /// is later replaced with [`Capsule::set_pointer`].
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::InvalidArgument`] if the name contains a NUL
    /// byte. `value` is dropped in that case.
    pub fn from_box<T: Send + 'static>(value: Box<T>, name: Option<&str>) -> CapsuleResult<Self> {
        let name = name.map(CapsuleName::new).transpose()?;
        let owned = CapsulePtr::from_non_null(std::ptr::NonNull::from(Box::leak(value)));

        let destructor = Destructor::new(move |_, _, _| {
            // SAFETY: `owned` came from the leaked `Box<T>` above, and this
            // destructor runs at most once.
            #[allow(unsafe_code)]
            let value = unsafe { Box::from_raw(owned.cast::<T>()) };
            drop(value);
        });

        Ok(Self::from_parts(owned, name, Some(destructor)))
    }

    pub(crate) fn from_parts(
        pointer: CapsulePtr,
        name: Option<CapsuleName>,
        destructor: Option<Destructor>,
    ) -> Self {
        debug!(
            name = ?name,
            addr = pointer.addr(),
            has_destructor = destructor.is_some(),
            "Created capsule"
        );
        Self {
            name,
            state: Mutex::new(State::Live(Slots {
                pointer,
                context: None,
                destructor,
            })),
        }
    }

    /// Run `f` against the live slots while holding the lock.
    fn with_live<R>(&self, f: impl FnOnce(&mut Slots) -> CapsuleResult<R>) -> CapsuleResult<R> {
        let mut state = self.state.lock();
        match &mut *state {
            State::Live(slots) => f(slots),
            State::Destroyed => {
                trace!(name = ?self.name, "Access to destroyed capsule");
                Err(CapsuleError::Invalidated)
            },
        }
    }

    fn check_tag(&self, expected: Option<&str>) -> CapsuleResult<()> {
        if tags_match(self.name.as_ref(), expected) {
            Ok(())
        } else {
            Err(CapsuleError::TypeMismatch {
                expected: expected.map(str::to_string),
                actual: self.name.as_ref().map(ToString::to_string),
            })
        }
    }

    /// Get the wrapped pointer, provided `expected` matches the capsule's name.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::Invalidated`] after destruction, or
    /// [`CapsuleError::TypeMismatch`] if the name does not match.
    pub fn pointer(&self, expected: Option<&str>) -> CapsuleResult<CapsulePtr> {
        self.with_live(|slots| {
            self.check_tag(expected)?;
            Ok(slots.pointer)
        })
    }

    /// Use the wrapped pointer while holding the capsule's lock.
    ///
    /// A concurrent [`Capsule::destroy`] waits until `f` returns, so the
    /// resource cannot be released while `f` is using it. `f` must not call
    /// back into this capsule.
    ///
    /// # Errors
    ///
    /// Same as [`Capsule::pointer`].
    pub fn with_pointer<R>(
        &self,
        expected: Option<&str>,
        f: impl FnOnce(CapsulePtr) -> R,
    ) -> CapsuleResult<R> {
        self.with_live(|slots| {
            self.check_tag(expected)?;
            Ok(f(slots.pointer))
        })
    }

    /// Replace the wrapped pointer.
    ///
    /// The previous pointer is not released; that is up to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::InvalidArgument`] if `pointer` is null, or
    /// [`CapsuleError::Invalidated`] after destruction.
    pub fn set_pointer<T>(&self, pointer: *mut T) -> CapsuleResult<()> {
        let pointer =
            CapsulePtr::new(pointer).ok_or_else(|| CapsuleError::null_pointer("pointer"))?;
        self.with_live(|slots| {
            trace!(
                name = ?self.name,
                old = slots.pointer.addr(),
                new = pointer.addr(),
                "Replaced capsule pointer"
            );
            slots.pointer = pointer;
            Ok(())
        })
    }

    /// Check the name without failing.
    #[must_use]
    pub fn is_valid(&self, expected: Option<&str>) -> bool {
        self.pointer(expected).is_ok()
    }

    /// The current context pointer, if one is set.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::Invalidated`] after destruction.
    pub fn context(&self) -> CapsuleResult<Option<CapsulePtr>> {
        self.with_live(|slots| Ok(slots.context))
    }

    /// Replace the context pointer. A null pointer clears it.
    ///
    /// The previous context is not released.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::Invalidated`] after destruction.
    pub fn set_context<T>(&self, context: *mut T) -> CapsuleResult<()> {
        let context = CapsulePtr::new(context);
        self.with_live(|slots| {
            slots.context = context;
            Ok(())
        })
    }

    /// Clear the context pointer.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::Invalidated`] after destruction.
    pub fn clear_context(&self) -> CapsuleResult<()> {
        self.with_live(|slots| {
            slots.context = None;
            Ok(())
        })
    }

    /// The capsule's name tag.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::Invalidated`] after destruction.
    pub fn name(&self) -> CapsuleResult<Option<CapsuleName>> {
        self.with_live(|_| Ok(self.name.clone()))
    }

    /// Borrow the stored name; it lives as long as the capsule itself.
    pub(crate) fn name_ref(&self) -> CapsuleResult<Option<&CapsuleName>> {
        self.with_live(|_| Ok(self.name.as_ref()))
    }

    /// Whether the capsule has been destroyed.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        matches!(*self.state.lock(), State::Destroyed)
    }

    /// Tear the capsule down, running its destructor.
    ///
    /// Returns `true` if this call destroyed the capsule and `false` if it
    /// was already destroyed, in which case nothing happens. The destructor
    /// runs after the lock is released with the pointer, name and context
    /// last stored.
    pub fn destroy(&self) -> bool {
        let slots = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, State::Destroyed) {
                State::Live(slots) => slots,
                State::Destroyed => {
                    trace!(name = ?self.name, "Capsule already destroyed");
                    return false;
                },
            }
        };

        debug!(
            name = ?self.name,
            addr = slots.pointer.addr(),
            has_destructor = slots.destructor.is_some(),
            "Destroying capsule"
        );

        if let Some(destructor) = slots.destructor {
            destructor.invoke(slots.pointer, self.name.as_ref(), slots.context);
        }
        true
    }
}

impl Drop for Capsule {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Capsule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Capsule");
        out.field("name", &self.name);
        match &*self.state.lock() {
            State::Live(slots) => out
                .field("pointer", &slots.pointer)
                .field("context", &slots.context)
                .field("destructor", &slots.destructor.is_some()),
            State::Destroyed => out.field("destroyed", &true),
        };
        out.finish()
    }
}
