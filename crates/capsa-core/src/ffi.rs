//! C ABI for capsules.
//!
//! Capsules cross the boundary as `*mut Capsule` handles created by
//! [`capsa_capsule_new`] and released by [`capsa_capsule_free`]. Every call
//! returns a status code; the full error for the last failing call on the
//! current thread is available from [`last_error`].
#![allow(unsafe_code)]

use std::cell::RefCell;
use std::ffi::CStr;
use std::ptr;

use libc::{c_char, c_int, c_void};
use tracing::warn;

use crate::capsule::Capsule;
use crate::destructor::Destructor;
use crate::error::{CapsuleError, CapsuleResult};
use crate::name::CapsuleName;
use crate::ptr::CapsulePtr;

thread_local! {
    static LAST_ERROR: RefCell<Option<CapsuleError>> = const { RefCell::new(None) };
}

/// Call succeeded.
pub const CAPSA_OK: c_int = 0;
/// Null pointer or malformed argument.
pub const CAPSA_ERR_INVALID_ARGUMENT: c_int = -1;
/// Name presented at access did not match.
pub const CAPSA_ERR_TYPE_MISMATCH: c_int = -2;
/// Capsule was already destroyed.
pub const CAPSA_ERR_INVALIDATED: c_int = -3;

/// Destructor signature accepted over the C ABI.
///
/// `name` is null for an unnamed capsule and otherwise points at the capsule's
/// own NUL-terminated copy, valid for the duration of the call.
pub type CapsaDestructorFn =
    unsafe extern "C" fn(pointer: *mut c_void, name: *const c_char, context: *mut c_void);

/// Get the last capsule error raised over the C ABI on this thread.
pub fn last_error() -> Option<CapsuleError> {
    LAST_ERROR.with(|e| e.borrow().clone())
}

/// Clear the last capsule error for this thread.
pub fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

fn set_last_error(error: CapsuleError) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some(error);
    });
}

impl CapsuleError {
    /// The C status code for this error.
    #[must_use]
    pub fn ffi_code(&self) -> c_int {
        match self {
            Self::InvalidArgument(_) => CAPSA_ERR_INVALID_ARGUMENT,
            Self::TypeMismatch { .. } => CAPSA_ERR_TYPE_MISMATCH,
            Self::Invalidated => CAPSA_ERR_INVALIDATED,
        }
    }
}

fn to_ffi_error(error: CapsuleError) -> c_int {
    warn!("Capsule FFI error: {}", error);
    let code = error.ffi_code();
    set_last_error(error);
    code
}

/// Convert results into C status codes, recording the error.
trait FfiResult {
    fn to_ffi_code(self) -> c_int;
}

impl FfiResult for CapsuleResult<()> {
    fn to_ffi_code(self) -> c_int {
        match self {
            Ok(()) => CAPSA_OK,
            Err(e) => to_ffi_error(e),
        }
    }
}

/// # Safety
///
/// `capsule` must be null or a handle from [`capsa_capsule_new`] that has not
/// been freed.
unsafe fn capsule_ref<'a>(capsule: *const Capsule) -> CapsuleResult<&'a Capsule> {
    // SAFETY: guaranteed by the caller.
    unsafe { capsule.as_ref() }.ok_or_else(|| CapsuleError::null_pointer("capsule"))
}

/// # Safety
///
/// `name` must be null or point at a NUL-terminated string.
unsafe fn read_name(name: *const c_char) -> CapsuleResult<Option<CapsuleName>> {
    if name.is_null() {
        return Ok(None);
    }
    // SAFETY: guaranteed by the caller.
    let name = unsafe { CStr::from_ptr(name) };
    CapsuleName::from_c_str(name).map(Some)
}

/// # Safety
///
/// `out` must be null or valid for a write of `T`.
unsafe fn write_out<T>(out: *mut T, value: T) -> CapsuleResult<()> {
    if out.is_null() {
        return Err(CapsuleError::null_pointer("output pointer"));
    }
    // SAFETY: non-null and valid per the caller.
    unsafe { out.write(value) };
    Ok(())
}

fn c_destructor(release: CapsaDestructorFn) -> Destructor {
    Destructor::new(move |pointer, name, context| {
        let name = name.map_or(ptr::null(), |n| n.as_c_str().as_ptr());
        let context = context.map_or(ptr::null_mut(), CapsulePtr::as_ptr);
        // SAFETY: the creator vouched for `release` when registering it.
        unsafe { release(pointer.as_ptr(), name, context) };
    })
}

/// Create a capsule and store its handle in `*out`.
///
/// The name is copied. On failure `*out` is left untouched and the destructor
/// is never called.
///
/// # Safety
///
/// `name` must be null or a NUL-terminated string, `out` must be valid for a
/// write, and `destructor` must be safe to call from whichever thread ends up
/// destroying the capsule.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn capsa_capsule_new(
    pointer: *mut c_void,
    name: *const c_char,
    destructor: Option<CapsaDestructorFn>,
    out: *mut *mut Capsule,
) -> c_int {
    let result = (|| {
        if out.is_null() {
            return Err(CapsuleError::null_pointer("output pointer"));
        }
        let pointer =
            CapsulePtr::new(pointer).ok_or_else(|| CapsuleError::null_pointer("pointer"))?;
        // SAFETY: forwarded from our caller.
        let name = unsafe { read_name(name) }?;
        let capsule = Capsule::from_parts(pointer, name, destructor.map(c_destructor));
        // SAFETY: `out` checked non-null above and valid per our caller.
        unsafe { write_out(out, Box::into_raw(Box::new(capsule))) }
    })();
    result.to_ffi_code()
}

/// Store the wrapped pointer in `*out` if `expected` matches the name.
///
/// # Safety
///
/// `capsule` must be a live handle, `expected` null or NUL-terminated, and
/// `out` valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn capsa_capsule_get_pointer(
    capsule: *const Capsule,
    expected: *const c_char,
    out: *mut *mut c_void,
) -> c_int {
    let result = (|| {
        // SAFETY: forwarded from our caller.
        let capsule = unsafe { capsule_ref(capsule) }?;
        // SAFETY: forwarded from our caller.
        let expected = unsafe { read_name(expected) }?;
        let pointer = capsule.pointer(expected.as_ref().map(CapsuleName::as_str))?;
        // SAFETY: forwarded from our caller.
        unsafe { write_out(out, pointer.as_ptr()) }
    })();
    result.to_ffi_code()
}

/// Replace the wrapped pointer. The previous pointer is not released.
///
/// # Safety
///
/// `capsule` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn capsa_capsule_set_pointer(
    capsule: *const Capsule,
    pointer: *mut c_void,
) -> c_int {
    let result = (|| {
        // SAFETY: forwarded from our caller.
        let capsule = unsafe { capsule_ref(capsule) }?;
        capsule.set_pointer(pointer)
    })();
    result.to_ffi_code()
}

/// Store the context pointer (null if unset) in `*out`.
///
/// # Safety
///
/// `capsule` must be a live handle and `out` valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn capsa_capsule_get_context(
    capsule: *const Capsule,
    out: *mut *mut c_void,
) -> c_int {
    let result = (|| {
        // SAFETY: forwarded from our caller.
        let capsule = unsafe { capsule_ref(capsule) }?;
        let context = capsule.context()?.map_or(ptr::null_mut(), CapsulePtr::as_ptr);
        // SAFETY: forwarded from our caller.
        unsafe { write_out(out, context) }
    })();
    result.to_ffi_code()
}

/// Replace the context pointer; null clears it.
///
/// # Safety
///
/// `capsule` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn capsa_capsule_set_context(
    capsule: *const Capsule,
    context: *mut c_void,
) -> c_int {
    let result = (|| {
        // SAFETY: forwarded from our caller.
        let capsule = unsafe { capsule_ref(capsule) }?;
        capsule.set_context(context)
    })();
    result.to_ffi_code()
}

/// Store the capsule's name (null if unnamed) in `*out`.
///
/// The string is owned by the capsule and stays valid until
/// [`capsa_capsule_free`].
///
/// # Safety
///
/// `capsule` must be a live handle and `out` valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn capsa_capsule_get_name(
    capsule: *const Capsule,
    out: *mut *const c_char,
) -> c_int {
    let result = (|| {
        // SAFETY: forwarded from our caller.
        let capsule = unsafe { capsule_ref(capsule) }?;
        let name = capsule
            .name_ref()?
            .map_or(ptr::null(), |n| n.as_c_str().as_ptr());
        // SAFETY: forwarded from our caller.
        unsafe { write_out(out, name) }
    })();
    result.to_ffi_code()
}

/// Return 1 if the capsule is live and `expected` matches its name, else 0.
///
/// Never records an error.
///
/// # Safety
///
/// `capsule` must be null or a live handle; `expected` null or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn capsa_capsule_is_valid(
    capsule: *const Capsule,
    expected: *const c_char,
) -> c_int {
    // SAFETY: forwarded from our caller.
    let Ok(capsule) = (unsafe { capsule_ref(capsule) }) else {
        return 0;
    };
    // SAFETY: forwarded from our caller.
    let Ok(expected) = (unsafe { read_name(expected) }) else {
        return 0;
    };
    c_int::from(capsule.is_valid(expected.as_ref().map(CapsuleName::as_str)))
}

/// Destroy the capsule, running its destructor.
///
/// Returns 1 if this call destroyed it, 0 if it was already destroyed, or a
/// negative status code for a null handle. The handle itself stays allocated
/// until [`capsa_capsule_free`].
///
/// # Safety
///
/// `capsule` must be a handle that has not been freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn capsa_capsule_destroy(capsule: *const Capsule) -> c_int {
    // SAFETY: forwarded from our caller.
    match unsafe { capsule_ref(capsule) } {
        Ok(capsule) => c_int::from(capsule.destroy()),
        Err(e) => to_ffi_error(e),
    }
}

/// Destroy the capsule if still live and release the handle.
///
/// # Safety
///
/// `capsule` must be null or a handle from [`capsa_capsule_new`] that is not
/// used again afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn capsa_capsule_free(capsule: *mut Capsule) {
    if capsule.is_null() {
        return;
    }
    // SAFETY: the handle was produced by `Box::into_raw` in `capsa_capsule_new`.
    drop(unsafe { Box::from_raw(capsule) });
}
