// Stores module - durable key-value persistence

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::StoreResult;

pub mod file_store;
pub mod memory_store;


pub use file_store::FileStore;
pub use memory_store::MemoryStore;

/// Change notification emitted by a store after every successful write or
/// delete. `origin` identifies the writer so that a subscriber can ignore
/// its own writes and react only to external ones.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub key: String,
    pub origin: Uuid,
}

/// Trait defining the interface for durable string-keyed storage.
///
/// Semantics follow a browser-local-storage model: whole-value reads and
/// overwrites under string keys, with change events broadcast to other
/// holders of the same store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under a key
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a value under a key (create or overwrite)
    async fn put(&self, key: &str, value: &str, origin: Uuid) -> StoreResult<()>;

    /// Delete a key; deleting an absent key is a no-op
    async fn delete(&self, key: &str, origin: Uuid) -> StoreResult<()>;

    /// List all keys starting with the given prefix
    async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Subscribe to change notifications for this store
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}
