//! Durable store abstraction for the serialized conversation list.

use thiserror::Error;

/// Error type for durable store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` storage error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// File system error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// A previous holder panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Result type for durable store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Synchronous key-value persistence for one serialized value.
///
/// Every `save` overwrites the previous value wholesale.
pub trait DurableStore: Send + Sync {
    /// Read the stored value, if any.
    ///
    /// # Errors
    /// Returns an error if the medium cannot be read.
    fn load(&self) -> StoreResult<Option<String>>;

    /// Replace the stored value.
    ///
    /// # Errors
    /// Returns an error if the medium cannot be written.
    fn save(&self, serialized: &str) -> StoreResult<()>;
}
