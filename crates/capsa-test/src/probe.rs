//! A destructor that records how it was called.

use std::sync::Arc;

use capsa_core::{CapsulePtr, Destructor};
use parking_lot::Mutex;

/// The arguments one destructor invocation received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestructorCall {
    /// Address of the payload pointer.
    pub pointer: usize,
    /// The capsule's name, if it had one.
    pub name: Option<String>,
    /// Address of the context, if one was set.
    pub context: Option<usize>,
}

/// Hands out destructors that record every invocation.
///
/// Clones share the same log, so a probe can be kept by the test while its
/// destructors are moved into capsules.
#[derive(Debug, Clone, Default)]
pub struct DestructorProbe {
    calls: Arc<Mutex<Vec<DestructorCall>>>,
}

impl DestructorProbe {
    /// Create an empty probe.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A destructor that appends to this probe's log.
    #[must_use]
    pub fn destructor(&self) -> Destructor {
        let calls = Arc::clone(&self.calls);
        Destructor::new(move |pointer, name, context| {
            calls.lock().push(DestructorCall {
                pointer: pointer.addr(),
                name: name.map(|n| n.as_str().to_string()),
                context: context.map(CapsulePtr::addr),
            });
        })
    }

    /// Every call so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<DestructorCall> {
        self.calls.lock().clone()
    }

    /// Number of calls so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }

    /// The most recent call.
    #[must_use]
    pub fn last(&self) -> Option<DestructorCall> {
        self.calls.lock().last().cloned()
    }
}
