use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::models::{StoreError, StoreResult};

use super::{KeyValueStore, StoreEvent};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// In-memory implementation of the KeyValueStore trait.
///
/// An optional byte capacity models storage quota: writes that would push
/// the combined size of keys and values past it fail with `QuotaExceeded`.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    capacity_bytes: Option<usize>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    /// Create an unbounded in-memory store
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity_bytes: None,
            events,
        }
    }

    /// Create a store with a byte quota on keys plus values
    pub fn with_capacity_bytes(capacity_bytes: usize) -> Self {
        let mut store = Self::new();
        store.capacity_bytes = Some(capacity_bytes);
        store
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn used_bytes_excluding(entries: &HashMap<String, String>, key: &str) -> usize {
        entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }

    fn emit(&self, key: &str, origin: Uuid) {
        // Nobody listening is fine
        let _ = self.events.send(StoreEvent {
            key: key.to_string(),
            origin,
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str, origin: Uuid) -> StoreResult<()> {
        {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

            if let Some(capacity) = self.capacity_bytes {
                let needed =
                    Self::used_bytes_excluding(&entries, key) + key.len() + value.len();
                if needed > capacity {
                    return Err(StoreError::QuotaExceeded { needed, capacity });
                }
            }

            entries.insert(key.to_string(), value.to_string());
        }

        debug!(key, "memory store write");
        self.emit(key, origin);
        Ok(())
    }

    async fn delete(&self, key: &str, origin: Uuid) -> StoreResult<()> {
        let removed = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.remove(key).is_some()
        };

        if removed {
            debug!(key, "memory store delete");
            self.emit(key, origin);
        }
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}
