use std::any::type_name;
use std::fmt;
use std::num::NonZero;
use std::thread;

use new_zealand::nz;

use crate::{Error, Pool, Result};

/// Maximum pool size used when none is configured.
pub const DEFAULT_MAX_POOL_SIZE: NonZero<usize> = nz!(10);

/// Creates a new item when the pool has none to hand out.
pub(crate) type Factory<T> = Box<dyn Fn(&Pool<T>) -> T + Send + Sync>;

/// Restores an item to a clean state before it is handed out again.
pub(crate) type Reinitializer<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// Configuration controlling how a [`Pool`] creates, resets and retains items.
///
/// A policy bundles three things:
///
/// * A factory that creates a new item whenever the pool is empty. The factory receives a
///   reference to the pool that is asking for the item.
/// * An optional reinitialize function that is called every time an item is taken out of the
///   pool for reuse. It is never called on freshly created items. Without one, items are handed
///   out exactly as they were returned.
/// * The maximum number of items the pool will retain.
///
/// # Examples
///
/// ```
/// use slot_pool::{Pool, PoolPolicy};
///
/// let policy = PoolPolicy::new(|_| Vec::<u8>::with_capacity(1024), 4)?
///     .with_reinitialize(Vec::clear);
///
/// let pool = Pool::new(policy);
/// assert_eq!(pool.capacity(), 4);
/// # Ok::<(), slot_pool::Error>(())
/// ```
pub struct PoolPolicy<T> {
    factory: Factory<T>,
    reinitialize: Option<Reinitializer<T>>,
    max_pool_size: NonZero<usize>,
}

impl<T> PoolPolicy<T> {
    /// Creates a policy with the given factory and maximum pool size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMaxPoolSize`] if `max_pool_size` is zero.
    pub fn new<F>(factory: F, max_pool_size: usize) -> Result<Self>
    where
        F: Fn(&Pool<T>) -> T + Send + Sync + 'static,
    {
        let max_pool_size = NonZero::new(max_pool_size).ok_or(Error::InvalidMaxPoolSize)?;

        Ok(Self::from_parts(Box::new(factory), None, max_pool_size))
    }

    pub(crate) fn from_parts(
        factory: Factory<T>,
        reinitialize: Option<Reinitializer<T>>,
        max_pool_size: NonZero<usize>,
    ) -> Self {
        Self {
            factory,
            reinitialize,
            max_pool_size,
        }
    }

    /// Sets the function that resets an item before it is reused, replacing any previous one.
    #[must_use]
    pub fn with_reinitialize<R>(mut self, reinitialize: R) -> Self
    where
        R: Fn(&mut T) + Send + Sync + 'static,
    {
        self.reinitialize = Some(Box::new(reinitialize));
        self
    }

    /// The maximum number of items a pool using this policy retains.
    #[must_use]
    pub fn max_pool_size(&self) -> NonZero<usize> {
        self.max_pool_size
    }

    pub(crate) fn create(&self, pool: &Pool<T>) -> T {
        (self.factory)(pool)
    }

    pub(crate) fn reinitialize(&self, item: &mut T) {
        if let Some(reinitialize) = &self.reinitialize {
            reinitialize(item);
        }
    }
}

impl<T: Default + 'static> PoolPolicy<T> {
    /// Creates a policy that uses [`Default::default()`] as the factory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMaxPoolSize`] if `max_pool_size` is zero.
    pub fn with_default_factory(max_pool_size: usize) -> Result<Self> {
        Self::new(|_| T::default(), max_pool_size)
    }
}

impl<T> fmt::Debug for PoolPolicy<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract for the debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("reinitialize", &self.reinitialize.is_some())
            .field("max_pool_size", &self.max_pool_size)
            .finish_non_exhaustive()
    }
}

/// A maximum pool size scaled to the hardware: two items per available processor.
///
/// Falls back to [`DEFAULT_MAX_POOL_SIZE`] if the processor count cannot be determined.
#[must_use]
pub fn processor_scaled_max_pool_size() -> NonZero<usize> {
    thread::available_parallelism()
        .ok()
        .and_then(|processors| processors.checked_mul(nz!(2)))
        .unwrap_or(DEFAULT_MAX_POOL_SIZE)
}
