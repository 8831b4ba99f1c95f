//! Monotonic ID generation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out increasing IDs of type `Id`.
///
/// Unlike a plain counter this can be shared between threads, e.g. every clone of a
/// filesystem hands out IDs from the same sequence.
#[derive(Debug)]
pub struct Gen<Id> {
    next: AtomicU64,
    phantom: std::marker::PhantomData<fn() -> Id>,
}

impl<Id> Default for Gen<Id> {
    fn default() -> Self {
        Gen::from_start(0)
    }
}

impl<Id> Gen<Id> {
    pub fn from_start(start: u64) -> Self {
        Gen {
            next: AtomicU64::new(start),
            phantom: std::marker::PhantomData,
        }
    }
}

impl<Id: From<u64>> Gen<Id> {
    pub fn next(&self) -> Id {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        assert_ne!(id, u64::MAX, "ID allocator overflowed u64");
        Id::from(id)
    }
}
