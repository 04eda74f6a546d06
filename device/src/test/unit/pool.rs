use crate::error::Error;
use crate::event::{ElementType, EventKind};
use crate::pool::EventPool;

#[test]
fn register_grows_until_capacity() {
    let mut pool = EventPool::new(2);

    let (slot_a, handle_a) = pool.register(EventKind::SerialKernel).unwrap();
    let (slot_b, handle_b) = pool.register(EventKind::SyncMarker).unwrap();
    assert_ne!(slot_a, slot_b);
    assert_ne!(handle_a, handle_b);
    assert_eq!(pool.in_use(), 2);

    let err = pool.register(EventKind::SyncBarrier).unwrap_err();
    assert!(matches!(err, Error::EventPoolExhausted { capacity: 2 }), "got {err:?}");
}

#[test]
fn release_recycles_slot_with_fresh_handle() {
    let mut pool = EventPool::new(1);

    let (slot, handle) = pool.register(EventKind::Write(ElementType::F32)).unwrap();
    pool.release(slot);
    assert_eq!(pool.in_use(), 0);

    let (slot_again, handle_again) = pool.register(EventKind::Read(ElementType::F32)).unwrap();
    assert_eq!(slot, slot_again);
    assert_ne!(handle, handle_again, "handles are never reused");
}

#[test]
fn double_release_is_a_noop() {
    let mut pool = EventPool::new(2);

    let (slot, _) = pool.register(EventKind::SyncMarker).unwrap();
    pool.release(slot);
    pool.release(slot);

    // Both registrations below must succeed without aliasing one free slot.
    pool.register(EventKind::SyncMarker).unwrap();
    pool.register(EventKind::SyncMarker).unwrap();
    assert_eq!(pool.in_use(), 2);
}

#[test]
fn kind_is_tracked_per_slot() {
    let mut pool = EventPool::new(4);

    let (slot, _) = pool.register(EventKind::ParallelKernel).unwrap();
    assert_eq!(pool.kind(slot), Some(EventKind::ParallelKernel));

    pool.release(slot);
    assert_eq!(pool.kind(slot), None);
    assert_eq!(pool.kind(100), None);
}

#[test]
fn handles_are_only_visible_while_live() {
    let mut pool = EventPool::new(4);

    let (slot, handle) = pool.register(EventKind::SyncMarker).unwrap();
    assert_eq!(pool.handle(slot), Some(handle));

    pool.release(slot);
    assert_eq!(pool.handle(slot), None);
}
