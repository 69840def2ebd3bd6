//! In-process durable store, used for ephemeral runs and tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

use super::store::{DurableStore, StoreResult};

/// Thread-safe in-memory store keyed like the persistent backends.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: DashMap<String, String>,
    key: String,
    saves: AtomicUsize,
}

impl InMemoryStore {
    /// Create an empty store writing under `key`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            entries: DashMap::new(),
            key: key.into(),
            saves: AtomicUsize::new(0),
        }
    }

    /// Create a store already holding `serialized` under `key`.
    #[must_use]
    pub fn with_contents(key: impl Into<String>, serialized: impl Into<String>) -> Self {
        let store = Self::new(key);
        store.entries.insert(store.key.clone(), serialized.into());
        store
    }

    /// Current stored value, without going through the trait.
    #[must_use]
    pub fn contents(&self) -> Option<String> {
        self.entries.get(&self.key).map(|entry| entry.value().clone())
    }

    /// Number of successful saves since creation.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl DurableStore for InMemoryStore {
    fn load(&self) -> StoreResult<Option<String>> {
        Ok(self.contents())
    }

    fn save(&self, serialized: &str) -> StoreResult<()> {
        self.entries.insert(self.key.clone(), serialized.to_string());
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
