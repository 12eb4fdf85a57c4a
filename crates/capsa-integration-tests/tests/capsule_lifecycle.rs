//! End-to-end capsule lifecycle: create, access, destroy.

mod common;

use std::sync::Arc;
use std::thread;

use capsa_core::{Capsule, CapsuleError};
use capsa_test::{DestructorCall, leak_test_value};
use common::ProbedCapsule;

#[test]
fn test_buffer_capsule_lifecycle() {
    let ProbedCapsule {
        capsule,
        pointer,
        probe,
    } = ProbedCapsule::new(Some("buffer"));

    assert_eq!(capsule.pointer(Some("buffer")).unwrap(), pointer);
    assert!(matches!(
        capsule.pointer(Some("other")),
        Err(CapsuleError::TypeMismatch { .. })
    ));

    assert!(capsule.destroy());
    assert_eq!(
        probe.calls(),
        vec![DestructorCall {
            pointer: pointer.addr(),
            name: Some("buffer".to_string()),
            context: None,
        }]
    );

    assert_eq!(
        capsule.pointer(Some("buffer")),
        Err(CapsuleError::Invalidated)
    );

    assert!(!capsule.destroy());
    drop(capsule);
    assert_eq!(probe.count(), 1);
}

#[test]
fn test_destructor_sees_final_pointer_and_context() {
    let probed = ProbedCapsule::new(Some("buffer"));
    let replacement = leak_test_value(5_u16);
    let context = leak_test_value("ctx");

    probed.capsule.set_pointer(replacement.cast::<u16>()).unwrap();
    probed.capsule.set_context(context.cast::<&str>()).unwrap();
    drop(probed.capsule);

    let call = probed.probe.last().unwrap();
    assert_eq!(call.pointer, replacement.addr());
    assert_eq!(call.context, Some(context.addr()));
}

#[test]
fn test_unnamed_capsule_accessed_with_absent_name() {
    let probed = ProbedCapsule::new(None);
    assert_eq!(probed.capsule.name().unwrap(), None);
    assert!(probed.capsule.is_valid(None));
    assert!(!probed.capsule.is_valid(Some("buffer")));

    probed.capsule.destroy();
    assert_eq!(probed.probe.last().unwrap().name, None);
}

#[test]
fn test_shared_capsule_destroyed_once_across_threads() {
    let probed = ProbedCapsule::new(Some("shared"));
    let probe = probed.probe.clone();
    let capsule = Arc::new(probed.capsule);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let capsule = Arc::clone(&capsule);
            thread::spawn(move || {
                let _ = capsule.pointer(Some("shared"));
                capsule.destroy()
            })
        })
        .collect();
    let destroyed = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();

    assert_eq!(destroyed, 1);
    assert_eq!(probe.count(), 1);
    assert!(!capsule.is_valid(Some("shared")));
}

#[test]
fn test_box_payload_reclaimed() {
    let capsule = Capsule::from_box(Box::new(vec![1_u32, 2, 3]), Some("vec")).unwrap();
    let len = capsule
        .with_pointer(Some("vec"), |ptr| {
            // SAFETY: the capsule owns a live Vec<u32> until destroyed.
            #[allow(unsafe_code)]
            let vec = unsafe { &*ptr.cast::<Vec<u32>>() };
            vec.len()
        })
        .unwrap();
    assert_eq!(len, 3);
    assert!(capsule.destroy());
}
