//! Shared helpers for integration tests.

use capsa_core::{Capsule, CapsulePtr};
use capsa_test::{DestructorProbe, init_test_logging, leak_test_value};

/// A capsule over a leaked byte buffer, with a probe watching its destructor.
#[allow(dead_code)]
pub struct ProbedCapsule {
    /// The capsule under test.
    pub capsule: Capsule,
    /// The pointer it was created with.
    pub pointer: CapsulePtr,
    /// Records destructor calls.
    pub probe: DestructorProbe,
}

#[allow(dead_code)]
impl ProbedCapsule {
    /// Create a capsule named `name` over a fresh buffer.
    pub fn new(name: Option<&str>) -> Self {
        init_test_logging();
        let probe = DestructorProbe::new();
        let pointer = leak_test_value([0_u8; 64]);
        let capsule = Capsule::new(pointer.cast::<[u8; 64]>(), name, Some(probe.destructor()))
            .expect("capsule creation failed");
        Self {
            capsule,
            pointer,
            probe,
        }
    }
}

/// C-ABI functions exported through API tables in these tests.
#[allow(dead_code)]
pub mod native {
    pub extern "C" fn add(a: i32, b: i32) -> i32 {
        a.wrapping_add(b)
    }

    pub extern "C" fn negate(a: i32) -> i32 {
        a.wrapping_neg()
    }
}
