#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A bounded, lock-free object pool for recycling short-lived items such as buffers and
//! builders under concurrent access.
//!
//! The pool keeps up to a fixed number of items in an array of atomic slots. Taking an item
//! claims an occupied slot with a single compare-and-swap and returning an item fills an empty
//! slot the same way, so no operation ever blocks or waits for another thread:
//!
//! * [`Pool::get()`] hands out a pooled item, reinitialized, or creates a new one if the pool is
//!   empty.
//! * [`Pool::return_item()`] places an item back into the pool, or drops it if the pool is full.
//! * [`Pool::get_scoped()`] wraps the item in a [`Pooled`] handle that returns it automatically.
//!
//! # Quick start
//!
//! ```rust
//! use slot_pool::Pool;
//!
//! let pool = Pool::builder()
//!     .factory(|_| Vec::<u8>::with_capacity(4096))
//!     .reinitialize(Vec::clear)
//!     .max_pool_size(8)
//!     .build()?;
//!
//! {
//!     let mut buffer = pool.get_scoped()?;
//!     buffer.extend_from_slice(b"some bytes");
//! } // Buffer goes back to the pool here.
//!
//! // The same buffer is reused, empty but with its capacity intact.
//! let buffer = pool.get()?;
//! assert!(buffer.is_empty());
//! assert!(buffer.capacity() >= 4096);
//! # Ok::<(), slot_pool::Error>(())
//! ```
//!
//! # Configuration
//!
//! A [`PoolPolicy`] supplies the factory used to create items, an optional function that
//! resets items before reuse and the maximum number of items to retain. Build one directly,
//! through [`Pool::builder()`], or use [`Pool::with_default()`] for types that implement
//! [`Default`]. Configuration mistakes are reported at construction time.
//!
//! # Best-effort bounds
//!
//! The pool never retains more items than it has slots. It does not, however, limit how many
//! items exist in total: when the pool is empty, `get()` simply creates more. Under contention,
//! a `get()` may create a new item even though another thread is just returning one.
//!
//! # Disposal
//!
//! [`Pool::dispose()`] drops every item currently in the pool and stops the pool from handing
//! out items. Items returned afterwards are dropped. Dropping the pool has the same effect.
//!
//! # Observability
//!
//! The pool emits `tracing` events for its lifecycle and for discarded items, and records hit,
//! miss and discard counts as `nm` events (`slot_pool_*`).

mod builder;
mod error;
mod metrics;
mod policy;
mod pool;
mod pooled;
mod slot_store;

pub use builder::*;
pub use error::*;
pub use policy::{DEFAULT_MAX_POOL_SIZE, PoolPolicy, processor_scaled_max_pool_size};
pub use pool::*;
pub use pooled::*;
