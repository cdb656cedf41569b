//! Process-wide table id allocation

use crate::types::TableId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic table id source
///
/// A single atomic counter holding the next id to hand out. `observe_id`
/// raises the floor so ids restored from disk are never issued again.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Issue a fresh id
    pub fn generate_id(&self) -> TableId {
        let id = self.next.fetch_add(1, Ordering::SeqCst);
        assert!(id != TableId::MAX, "table id space exhausted");
        id
    }

    /// Make sure later ids are greater than `id`
    pub fn observe_id(&self, id: TableId) {
        self.next.fetch_max(id.saturating_add(1), Ordering::SeqCst);
    }

    /// Id the next `generate_id` call would return, absent concurrent callers
    pub fn peek_next_id(&self) -> TableId {
        self.next.load(Ordering::SeqCst)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

static TABLE_IDS: IdAllocator = IdAllocator::new();

/// Issue a fresh id from the process-wide allocator
pub fn generate_id() -> TableId {
    TABLE_IDS.generate_id()
}

/// Raise the process-wide floor above a restored id
pub fn observe_id(id: TableId) {
    TABLE_IDS.observe_id(id)
}
