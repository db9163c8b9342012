//! Error types for cache construction.

use std::num::TryFromIntError;

/// Errors returned by [`LruCache`](crate::LruCache) constructors.
///
/// Lookups never fail: a missing key is reported as `None`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A constructor argument was out of range, e.g. a capacity of zero.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub(crate) fn zero_capacity() -> Self {
        Error::InvalidArgument("capacity must be greater than zero".to_string())
    }
}

impl From<TryFromIntError> for Error {
    fn from(err: TryFromIntError) -> Self {
        Error::InvalidArgument(format!("capacity is not a positive integer: {err}"))
    }
}

/// Result alias used by this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
