//! Durable storage for the conversation list.
//!
//! - `store`: the `DurableStore` trait and its error type
//! - `codec`: JSON encoding of the conversation list
//! - `sqlite_store`, `file_store`, `memory_store`: backends

pub mod codec;
pub mod file_store;
pub mod memory_store;
pub mod sqlite_store;
pub mod store;

use std::sync::Arc;

use tracing::info;

use crate::config::{StorageBackend, StorageConfig};

pub use codec::{decode_conversations, encode_conversations};
pub use file_store::JsonFileStore;
pub use memory_store::InMemoryStore;
pub use sqlite_store::SqliteStore;
pub use store::{DurableStore, StoreError, StoreResult};

/// Build the store selected by `config`.
///
/// # Errors
/// Returns an error if the backend cannot be opened.
pub fn open_store(config: &StorageConfig) -> StoreResult<Arc<dyn DurableStore>> {
    let store: Arc<dyn DurableStore> = match config.backend {
        StorageBackend::Sqlite => Arc::new(SqliteStore::open(&config.path, config.key.clone())?),
        StorageBackend::JsonFile => Arc::new(JsonFileStore::new(config.path.clone())),
        StorageBackend::Memory => Arc::new(InMemoryStore::new(config.key.clone())),
    };
    info!(
        "Opened {:?} store at {}",
        config.backend,
        config.path.display()
    );
    Ok(store)
}
