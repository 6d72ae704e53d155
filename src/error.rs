//! Error types for the cache library
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache library.
///
/// The enum is `Clone` because a deduplicated computation hands the same
/// outcome to every concurrent joiner; each joiner receives its own copy
/// of the error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key rejected by validation (e.g. exceeds the maximum length)
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Invalidation pattern could not be compiled
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// A caller-supplied factory failed
    #[error("Factory error: {0}")]
    Factory(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Conversions ==
/// Lets caller factories built on `anyhow` bubble errors out with `?`.
impl From<anyhow::Error> for CacheError {
    fn from(err: anyhow::Error) -> Self {
        CacheError::Factory(format!("{err:#}"))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache library.
pub type Result<T> = std::result::Result<T, CacheError>;
