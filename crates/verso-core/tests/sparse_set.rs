//! SparseSet generational handle tests.
//!
//! Handles in the text server are `IndexSlot`s, so these cover the
//! properties the server relies on: stale handles never alias a new object
//! and freed slots are reused.

use verso_core::alloc::sparse_set::{IndexSlot, SparseSet};

#[test]
fn test_push_and_get() {
    let mut set = SparseSet::new();

    let idx = set.push("font");
    let idx2 = set.push("shaped");

    assert_eq!(*set.get(idx), "font");
    assert_eq!(*set.get(idx2), "shaped");
}

#[test]
fn test_get_mut() {
    let mut set = SparseSet::new();

    let idx = set.push(42);
    *set.get_mut(idx) = 100;

    assert_eq!(*set.get(idx), 100);
}

#[test]
fn test_try_get_never_issued_returns_none() {
    let set = SparseSet::<i32>::new();
    assert_eq!(set.try_get(IndexSlot::new(0, 999)), None);
}

#[test]
#[should_panic(expected = "invalid generation")]
fn test_use_after_free_panics() {
    let mut set = SparseSet::new();

    let idx = set.push(42);
    set.remove(idx);
    let _ = set.get(idx);
}

#[test]
fn test_generation_increments_on_reuse() {
    let mut set = SparseSet::new();

    let first = set.push(1);
    set.remove(first);
    let second = set.push(2);
    set.remove(second);
    let third = set.push(3);

    assert_eq!(first.index(), third.index());
    assert_eq!(third.generation(), 2);
    assert!(!set.contains(first));
    assert!(!set.contains(second));
    assert!(set.contains(third));
}

#[test]
fn test_len_tracks_live_entries() {
    let mut set = SparseSet::new();
    let slots: Vec<_> = (0..5).map(|i| set.push(i)).collect();

    set.remove(slots[1]);
    set.remove(slots[3]);
    assert_eq!(set.len(), 3);

    set.push(10);
    assert_eq!(set.len(), 4);
    assert_eq!(set.iter().count(), 4);
}
