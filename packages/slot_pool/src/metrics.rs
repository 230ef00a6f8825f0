//! Metrics for the slot pool.
//!
//! The events are per-thread instances so observing them from many threads at once
//! does not introduce contention on the hot path.

use nm::{Event, Magnitude};

/// Histogram buckets for the number of slots inspected by a successful claim.
///
/// Pools are expected to be small, so most claims should succeed within the first few slots.
const CLAIM_SCAN_LENGTH_BUCKETS: &[Magnitude] = &[1, 2, 4, 8, 16, 32, 64, 128];

thread_local! {
    /// A `get()` was satisfied by an item already resident in the pool.
    pub(crate) static GET_HITS: Event = Event::builder()
        .name("slot_pool_get_hits")
        .build();

    /// A `get()` found the pool empty and had to create a new item.
    pub(crate) static GET_MISSES: Event = Event::builder()
        .name("slot_pool_get_misses")
        .build();

    /// A returned item was placed into a free slot.
    pub(crate) static RETURN_STORED: Event = Event::builder()
        .name("slot_pool_return_stored")
        .build();

    /// A returned item was dropped because the pool was full or disposed.
    pub(crate) static RETURN_DISCARDED: Event = Event::builder()
        .name("slot_pool_return_discarded")
        .build();

    /// The number of slots inspected before a claim succeeded.
    ///
    /// The magnitude is the 1-based position of the claimed slot.
    pub(crate) static CLAIM_SCAN_LENGTH: Event = Event::builder()
        .name("slot_pool_claim_scan_length")
        .histogram(CLAIM_SCAN_LENGTH_BUCKETS)
        .build();
}
