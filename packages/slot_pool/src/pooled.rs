use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};

use crate::Pool;

/// An item taken from a [`Pool`] that goes back to the pool when the handle is dropped.
///
/// Returned by [`Pool::get_scoped()`]. The handle dereferences to the item. When it goes out of
/// scope, including during unwinding from a panic, the item is passed to
/// [`Pool::return_item()`] exactly once. If the pool is full or has been disposed by then, the
/// item is dropped instead of retained.
///
/// Use [`into_inner()`][Self::into_inner] to keep the item instead of returning it.
///
/// # Examples
///
/// ```
/// use slot_pool::Pool;
///
/// let pool = Pool::with_default(String::clear, 4)?;
///
/// {
///     let mut message = pool.get_scoped()?;
///     message.push_str("hello");
///     assert_eq!(message.as_str(), "hello");
/// }
///
/// assert_eq!(pool.len(), 1);
/// # Ok::<(), slot_pool::Error>(())
/// ```
pub struct Pooled<'p, T> {
    pool: &'p Pool<T>,

    // Taken out exactly once, either in `drop()` or in `into_inner()`.
    item: ManuallyDrop<Box<T>>,
}

impl<'p, T> Pooled<'p, T> {
    /// Binds an item to the pool it will be returned to.
    ///
    /// The item does not need to have come from this pool.
    #[must_use]
    pub fn new(pool: &'p Pool<T>, item: Box<T>) -> Self {
        Self {
            pool,
            item: ManuallyDrop::new(item),
        }
    }

    /// The pool the item will be returned to.
    #[must_use]
    pub fn pool(&self) -> &'p Pool<T> {
        self.pool
    }

    /// Detaches the item from the handle without returning it to the pool.
    #[must_use]
    pub fn into_inner(self) -> Box<T> {
        let mut this = ManuallyDrop::new(self);

        // SAFETY: `this` is never dropped, so the item cannot be taken out a second time.
        unsafe { ManuallyDrop::take(&mut this.item) }
    }
}

impl<T> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.item
    }
}

impl<T> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.item
    }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        // SAFETY: This is the only place besides `into_inner()` that takes the item, and
        // `into_inner()` prevents this from running.
        let item = unsafe { ManuallyDrop::take(&mut self.item) };

        // A full or disposed pool drops the item itself, which is all we would do anyway.
        _ = self.pool.return_item(item);
    }
}

impl<T: fmt::Debug> fmt::Debug for Pooled<'_, T> {
    #[cfg_attr(test, mutants::skip)] // No API contract for the debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("item", &**self.item)
            .finish_non_exhaustive()
    }
}
