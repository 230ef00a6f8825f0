use thiserror::Error;

/// Errors that can occur when constructing or using a [`Pool`][crate::Pool].
///
/// A full pool or a duplicate return is not an error. Both are reported as `false` from
/// [`Pool::return_item()`][crate::Pool::return_item] because they are expected outcomes
/// under normal operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The maximum pool size was configured as zero. A pool must have at least one slot.
    #[error("invalid maximum pool size: must be greater than zero")]
    InvalidMaxPoolSize,

    /// The pool was configured without a factory function, so it would have no way to create
    /// items when empty.
    #[error("invalid pool configuration: no factory function was provided")]
    MissingFactory,

    /// An item was requested from a pool that has already been disposed.
    #[error("the pool has been disposed and no longer hands out items")]
    Disposed,
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn messages_name_the_problem() {
        assert!(Error::InvalidMaxPoolSize.to_string().contains("greater than zero"));
        assert!(Error::MissingFactory.to_string().contains("factory"));
        assert!(Error::Disposed.to_string().contains("disposed"));
    }

    #[test]
    fn disposed_is_error() {
        let result: Result<()> = Err(Error::Disposed);

        assert!(matches!(result, Err(Error::Disposed)));
    }
}
