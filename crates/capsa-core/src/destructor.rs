//! Release callbacks run when a capsule is torn down.

use std::fmt;

use crate::name::CapsuleName;
use crate::ptr::CapsulePtr;

type ReleaseFn = dyn FnOnce(CapsulePtr, Option<&CapsuleName>, Option<CapsulePtr>) + Send;

/// Callback that releases a capsule's resource.
///
/// Invoked with the pointer, name and context the capsule holds at the moment
/// of destruction. `FnOnce` means a destructor can run at most once; the
/// capsule guarantees it runs exactly once if the capsule was ever created.
pub struct Destructor(Box<ReleaseFn>);

impl Destructor {
    /// Wrap a closure as a destructor.
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce(CapsulePtr, Option<&CapsuleName>, Option<CapsulePtr>) + Send + 'static,
    {
        Self(Box::new(release))
    }

    /// A destructor that reclaims a `Box<T>` and drops it.
    ///
    /// # Safety
    ///
    /// The capsule this destructor is attached to must hold a pointer produced
    /// by [`Box::into_raw`] for a `Box<T>`, and no one else may free it.
    #[must_use]
    #[allow(unsafe_code)]
    pub unsafe fn drop_box<T: Send + 'static>() -> Self {
        Self::new(|pointer, _, _| {
            // SAFETY: guaranteed by the caller of `drop_box`.
            drop(unsafe { Box::from_raw(pointer.cast::<T>()) });
        })
    }

    pub(crate) fn invoke(
        self,
        pointer: CapsulePtr,
        name: Option<&CapsuleName>,
        context: Option<CapsulePtr>,
    ) {
        (self.0)(pointer, name, context);
    }
}

impl fmt::Debug for Destructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Destructor(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_invoke_passes_arguments() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in = Arc::clone(&seen);
        let name = CapsuleName::new("buffer").unwrap();
        let mut value = 1_u8;
        let ptr = CapsulePtr::new(&mut value as *mut u8).unwrap();

        let destructor = Destructor::new(move |pointer, name, context| {
            assert_eq!(name.map(CapsuleName::as_str), Some("buffer"));
            assert!(context.is_none());
            seen_in.store(pointer.addr(), Ordering::SeqCst);
        });
        destructor.invoke(ptr, Some(&name), None);

        assert_eq!(seen.load(Ordering::SeqCst), ptr.addr());
    }

    #[test]
    fn test_drop_box_reclaims() {
        struct Flag(Arc<AtomicUsize>);
        impl Drop for Flag {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let raw = Box::into_raw(Box::new(Flag(Arc::clone(&drops))));
        let ptr = CapsulePtr::new(raw).unwrap();

        #[allow(unsafe_code)]
        let destructor = unsafe { Destructor::drop_box::<Flag>() };
        destructor.invoke(ptr, None, None);

        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
