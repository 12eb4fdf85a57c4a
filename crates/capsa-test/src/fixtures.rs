//! Test fixtures for pointers and logging.

use std::ptr::NonNull;
use std::sync::Once;

use capsa_core::CapsulePtr;
use tracing_subscriber::EnvFilter;

/// Move `value` to the heap and leak it, returning a pointer usable as
/// capsule payload or context.
///
/// The allocation is never freed unless a destructor reclaims it with
/// `Box::from_raw`.
#[must_use]
pub fn leak_test_value<T>(value: T) -> CapsulePtr {
    CapsulePtr::from_non_null(NonNull::from(Box::leak(Box::new(value))))
}

static LOGGING: Once = Once::new();

/// Install a test-friendly subscriber once per process.
///
/// Honors `RUST_LOG`; otherwise capsa crates log at debug. Output goes
/// through the test harness's capture.
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("capsa_core=debug,capsa_api=debug,capsa_gen=debug")
        });
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
