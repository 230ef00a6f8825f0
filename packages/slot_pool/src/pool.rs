use std::any::type_name;
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace};

use crate::metrics::{GET_HITS, GET_MISSES, RETURN_DISCARDED, RETURN_STORED};
use crate::slot_store::{Release, SlotStore};
use crate::{Error, PoolBuilder, PoolPolicy, Pooled, Result, processor_scaled_max_pool_size};

/// A bounded, thread-safe pool of reusable items.
///
/// Items are handed out as `Box<T>` by [`get()`][Self::get] and given back via
/// [`return_item()`][Self::return_item], or automatically when the [`Pooled`] handle returned
/// by [`get_scoped()`][Self::get_scoped] is dropped.
///
/// # Never blocks
///
/// The pool does not take any locks. Each of its slots is claimed and filled by a single atomic
/// compare-and-swap, so every operation completes after scanning the slots at most once:
///
/// * If `get()` finds no item to claim, it creates a new one using the policy's factory.
/// * If `return_item()` finds no free slot, the item is dropped.
///
/// Items are created lazily. The pool starts empty and is never pre-populated.
///
/// # Reinitialization
///
/// Every item taken out of the pool is passed through the policy's reinitialize function before
/// it is handed out. Freshly created items are not.
///
/// # Disposal
///
/// [`dispose()`][Self::dispose] drops every item resident in the pool and makes further calls to
/// `get()` fail with [`Error::Disposed`]. Items returned to a disposed pool are dropped
/// immediately. Items that callers hold at the time of disposal remain valid and are theirs to
/// drop. Dropping the pool disposes it.
///
/// # Thread safety
///
/// The pool is [`Send`] and [`Sync`] if `T` is [`Send`]. Share it between threads by reference
/// (e.g. via scoped threads) or wrap it in an `Arc`.
///
/// # Examples
///
/// ```
/// use slot_pool::Pool;
///
/// let pool = Pool::with_default(String::clear, 4)?;
///
/// let mut item = pool.get()?;
/// item.push_str("hello");
/// assert!(pool.return_item(item));
///
/// // The same allocation comes back, reinitialized.
/// let item = pool.get()?;
/// assert!(item.is_empty());
/// # Ok::<(), slot_pool::Error>(())
/// ```
pub struct Pool<T> {
    slots: SlotStore<T>,
    policy: PoolPolicy<T>,

    /// Only ever goes from `false` to `true`.
    disposed: AtomicBool,
}

impl<T> Pool<T> {
    /// Creates an empty pool governed by the given policy.
    #[must_use]
    pub fn new(policy: PoolPolicy<T>) -> Self {
        let slots = SlotStore::new(policy.max_pool_size());

        debug!(
            item_type = type_name::<T>(),
            max_pool_size = slots.capacity(),
            "pool created"
        );

        Self {
            slots,
            policy,
            disposed: AtomicBool::new(false),
        }
    }

    /// Creates a builder for configuring the pool.
    pub fn builder() -> PoolBuilder<T> {
        PoolBuilder::new()
    }

    /// Takes an item from the pool, creating a new one if the pool is empty.
    ///
    /// Items taken from the pool are reinitialized before they are returned. Contention with
    /// other threads never causes this to fail. At worst, it creates a new item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if the pool has been disposed.
    ///
    /// # Panics
    ///
    /// Panics raised by the policy's factory or reinitialize function propagate to the caller.
    pub fn get(&self) -> Result<Box<T>> {
        if self.is_disposed() {
            return Err(Error::Disposed);
        }

        if let Some(ptr) = self.slots.claim() {
            GET_HITS.with(|e| e.observe_once());

            // SAFETY: Only pointers obtained from `Box::leak()` in `return_item()` are
            // placed into the slots, and a successful claim transfers sole ownership of the
            // pointer to us.
            let mut item = unsafe { Box::from_raw(ptr.as_ptr()) };
            self.policy.reinitialize(&mut item);

            return Ok(item);
        }

        GET_MISSES.with(|e| e.observe_once());

        Ok(Box::new(self.policy.create(self)))
    }

    /// Takes an item from the pool wrapped in a handle that returns it to the pool when dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if the pool has been disposed.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::Pool;
    ///
    /// let pool = Pool::with_default(Vec::<u8>::clear, 2)?;
    ///
    /// {
    ///     let mut buffer = pool.get_scoped()?;
    ///     buffer.extend_from_slice(b"payload");
    /// } // Returned to the pool here.
    ///
    /// assert_eq!(pool.len(), 1);
    /// # Ok::<(), slot_pool::Error>(())
    /// ```
    pub fn get_scoped(&self) -> Result<Pooled<'_, T>> {
        Ok(Pooled::new(self, self.get()?))
    }

    /// Gives an item to the pool so it can be reused.
    ///
    /// Returns `true` if the item was placed into the pool. Returns `false` if it was not, in
    /// which case it has been dropped (pool full or disposed) or was already in the pool. None
    /// of these outcomes are errors.
    ///
    /// The item does not need to have come from this pool.
    pub fn return_item(&self, item: Box<T>) -> bool {
        if self.is_disposed() {
            trace!(
                item_type = type_name::<T>(),
                "dropping item returned to disposed pool"
            );
            RETURN_DISCARDED.with(|e| e.observe_once());
            return false;
        }

        // Leaking yields a reference, which converts to `NonNull` without a null check. The
        // allocation is reclaimed with `Box::from_raw()` by whoever takes it out of a slot.
        let ptr = NonNull::from(Box::leak(item));

        match self.slots.release(ptr) {
            Release::Stored => {
                RETURN_STORED.with(|e| e.observe_once());
                true
            }
            // The resident copy owns the item, so we must not free it here. Zero-sized items
            // never get here because they all share one address.
            Release::Duplicate => {
                trace!(
                    item_type = type_name::<T>(),
                    "ignoring item that is already in the pool"
                );
                false
            }
            Release::Full => {
                // SAFETY: The pointer came from `Box::leak()` above and the store did not take
                // it, so we still have sole ownership.
                drop(unsafe { Box::from_raw(ptr.as_ptr()) });

                trace!(
                    item_type = type_name::<T>(),
                    "dropping item returned to full pool"
                );
                RETURN_DISCARDED.with(|e| e.observe_once());
                false
            }
        }
    }

    /// Disposes of the pool, dropping every item it currently holds.
    ///
    /// After this, [`get()`][Self::get] fails with [`Error::Disposed`] and returned items are
    /// dropped instead of retained. Calling this more than once has no further effect.
    pub fn dispose(&self) {
        // Only the first caller gets to drain the slots.
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let dropped = self.drain();

        debug!(item_type = type_name::<T>(), dropped, "pool disposed");
    }

    /// Whether [`dispose()`][Self::dispose] has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// The number of items currently in the pool.
    ///
    /// Under concurrent use this is only a snapshot and may already be out of date when it
    /// is returned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the pool currently holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The maximum number of items the pool retains.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Drops every resident item, returning how many there were.
    fn drain(&self) -> usize {
        let mut dropped: usize = 0;

        for ptr in self.slots.drain() {
            // SAFETY: Only pointers obtained from `Box::leak()` in `return_item()` are placed
            // into the slots, and draining a slot transfers sole ownership to us.
            drop(unsafe { Box::from_raw(ptr.as_ptr()) });
            dropped = dropped.wrapping_add(1);
        }

        dropped
    }
}

impl<T: Default + 'static> Pool<T> {
    /// Creates a pool that uses [`Default::default()`] to create items and the given function
    /// to reinitialize them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMaxPoolSize`] if `max_pool_size` is zero.
    pub fn with_default<R>(reinitialize: R, max_pool_size: usize) -> Result<Self>
    where
        R: Fn(&mut T) + Send + Sync + 'static,
    {
        Ok(Self::new(
            PoolPolicy::with_default_factory(max_pool_size)?.with_reinitialize(reinitialize),
        ))
    }
}

/// Creates a pool of strings that are cleared before reuse, sized at two strings per
/// available processor.
///
/// # Examples
///
/// ```
/// let pool = slot_pool::string_pool();
///
/// let mut message = pool.get_scoped()?;
/// message.push_str("hello world");
/// # Ok::<(), slot_pool::Error>(())
/// ```
#[must_use]
pub fn string_pool() -> Pool<String> {
    Pool::new(PoolPolicy::from_parts(
        Box::new(|_: &Pool<String>| String::new()),
        Some(Box::new(String::clear)),
        processor_scaled_max_pool_size(),
    ))
}

impl<T> Drop for Pool<T> {
    fn drop(&mut self) {
        // Items released concurrently with `dispose()` may have landed in already drained
        // slots, so we always drain again.
        self.disposed.store(true, Ordering::Release);
        self.drain();
    }
}

impl<T> fmt::Display for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Usage {}/{}", self.len(), self.capacity())
    }
}

impl<T> fmt::Debug for Pool<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract for the debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("slots", &self.slots)
            .field("policy", &self.policy)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
