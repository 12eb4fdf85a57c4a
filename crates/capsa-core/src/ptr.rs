//! Non-null opaque pointer carried by a capsule.

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;

/// A non-null native pointer stored in a capsule.
///
/// The capsule never dereferences it. Whoever created the capsule decides what
/// it points at and supplies the destructor that releases it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapsulePtr(NonNull<c_void>);

// SAFETY: `CapsulePtr` is an address, never dereferenced by this crate. Moving
// the address between threads is sound; any access through it is the caller's
// (unsafe) responsibility.
#[allow(unsafe_code)]
unsafe impl Send for CapsulePtr {}
#[allow(unsafe_code)]
unsafe impl Sync for CapsulePtr {}

impl CapsulePtr {
    /// Wrap a raw pointer, returning `None` if it is null.
    #[must_use]
    pub fn new<T>(ptr: *mut T) -> Option<Self> {
        NonNull::new(ptr.cast::<c_void>()).map(Self)
    }

    /// Wrap an already non-null pointer.
    #[must_use]
    pub fn from_non_null<T>(ptr: NonNull<T>) -> Self {
        Self(ptr.cast())
    }

    /// The raw untyped pointer.
    #[must_use]
    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }

    /// Reinterpret the pointer as pointing at `T`.
    #[must_use]
    pub fn cast<T>(self) -> *mut T {
        self.0.as_ptr().cast()
    }

    /// The pointer's address, for logging and identity comparisons.
    #[must_use]
    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }
}

impl fmt::Debug for CapsulePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CapsulePtr({:#x})", self.addr())
    }
}

impl fmt::Pointer for CapsulePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_is_rejected() {
        assert!(CapsulePtr::new(std::ptr::null_mut::<u8>()).is_none());
    }

    #[test]
    fn test_cast_preserves_address() {
        let mut value = 7_u32;
        let raw: *mut u32 = &mut value;
        let ptr = CapsulePtr::new(raw).unwrap();

        assert_eq!(ptr.cast::<u32>(), raw);
        assert_eq!(ptr.addr(), raw as usize);
        assert_eq!(ptr, CapsulePtr::from_non_null(NonNull::from(&mut value)));
    }
}
