use std::any::type_name;
use std::fmt;
use std::num::NonZero;

use crate::policy::{Factory, Reinitializer};
use crate::{DEFAULT_MAX_POOL_SIZE, Error, Pool, PoolPolicy, Result};

/// Builder for creating an instance of [`Pool`].
///
/// A factory is mandatory. The reinitialize function is optional and the maximum pool size
/// defaults to [`DEFAULT_MAX_POOL_SIZE`].
///
/// # Examples
///
/// ```
/// use slot_pool::Pool;
///
/// let pool = Pool::builder()
///     .factory(|_| String::with_capacity(256))
///     .reinitialize(String::clear)
///     .max_pool_size(16)
///     .build()?;
///
/// assert_eq!(pool.capacity(), 16);
/// # Ok::<(), slot_pool::Error>(())
/// ```
#[must_use]
pub struct PoolBuilder<T> {
    factory: Option<Factory<T>>,
    reinitialize: Option<Reinitializer<T>>,
    max_pool_size: usize,
}

impl<T> fmt::Debug for PoolBuilder<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract for the debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("factory", &self.factory.is_some())
            .field("reinitialize", &self.reinitialize.is_some())
            .field("max_pool_size", &self.max_pool_size)
            .finish()
    }
}

impl<T> PoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            factory: None,
            reinitialize: None,
            max_pool_size: DEFAULT_MAX_POOL_SIZE.get(),
        }
    }

    /// Sets the function that creates a new item when the pool is empty.
    ///
    /// The function receives a reference to the pool requesting the item.
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Pool<T>) -> T + Send + Sync + 'static,
    {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Sets the function that resets an item before it is handed out for reuse.
    pub fn reinitialize<R>(mut self, reinitialize: R) -> Self
    where
        R: Fn(&mut T) + Send + Sync + 'static,
    {
        self.reinitialize = Some(Box::new(reinitialize));
        self
    }

    /// Sets the maximum number of items the pool retains. Must be greater than zero.
    pub fn max_pool_size(mut self, max_pool_size: usize) -> Self {
        self.max_pool_size = max_pool_size;
        self
    }

    /// Validates the configuration and builds the pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFactory`] if no factory was set and [`Error::InvalidMaxPoolSize`]
    /// if the maximum pool size is zero.
    pub fn build(self) -> Result<Pool<T>> {
        Ok(Pool::new(self.build_policy()?))
    }

    /// Validates the configuration and builds only the policy, without creating a pool.
    ///
    /// # Errors
    ///
    /// Same as [`build()`][Self::build].
    pub fn build_policy(self) -> Result<PoolPolicy<T>> {
        let factory = self.factory.ok_or(Error::MissingFactory)?;
        let max_pool_size = NonZero::new(self.max_pool_size).ok_or(Error::InvalidMaxPoolSize)?;

        Ok(PoolPolicy::from_parts(
            factory,
            self.reinitialize,
            max_pool_size,
        ))
    }
}
