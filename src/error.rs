//! Error types for the cache-aside layer
//!
//! Provides unified error handling using thiserror.
//!
//! Cache misses are never errors here; they surface as absent values. Every
//! variant below originates in a remote-store implementation and travels
//! through the adapter unmodified.

use thiserror::Error;

// == Store Error Enum ==
/// Unified error type for remote-store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Item lacks the key attribute its table schema requires
    #[error("item for table '{table}' is missing key attribute '{attribute}'")]
    MissingKeyAttribute {
        /// Table the item was written to
        table: String,
        /// Name of the absent partition/sort attribute
        attribute: String,
    },

    /// Conditional update failed because the item does not exist
    #[error("conditional update failed for key '{0}'")]
    ConditionFailed(String),

    /// Backend cannot be reached
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure, wrapped as-is
    #[error("remote store error: {0}")]
    Backend(#[from] anyhow::Error),
}

// == Result Type Alias ==
/// Convenience Result type for store and adapter operations.
pub type Result<T> = std::result::Result<T, StoreError>;
