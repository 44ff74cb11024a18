use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::StoreResult;

use super::{KeyValueStore, StoreEvent};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// File-backed implementation of the KeyValueStore trait.
///
/// The entire key-value map is serialized as a single JSON document and
/// rewritten on every mutation. Suited to cart-sized payloads, not bulk
/// data. A corrupt or missing file yields an empty store rather than an
/// error, matching the engine's lenient load policy.
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
    events: broadcast::Sender<StoreEvent>,
}

impl FileStore {
    /// Open a file store at the given path, loading any existing document
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(map) => {
                    info!(path = %path.display(), keys = map.len(), "file store loaded");
                    map
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "file store document is corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            path,
            entries: RwLock::new(entries),
            events,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self) -> StoreResult<()> {
        let payload = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            serde_json::to_string_pretty(&*entries)?
        };
        tokio::fs::write(&self.path, payload).await?;
        Ok(())
    }

    fn emit(&self, key: &str, origin: Uuid) {
        let _ = self.events.send(StoreEvent {
            key: key.to_string(),
            origin,
        });
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str, origin: Uuid) -> StoreResult<()> {
        {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.insert(key.to_string(), value.to_string());
        }
        self.flush().await?;

        debug!(key, path = %self.path.display(), "file store write");
        self.emit(key, origin);
        Ok(())
    }

    async fn delete(&self, key: &str, origin: Uuid) -> StoreResult<()> {
        let removed = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.remove(key).is_some()
        };

        if removed {
            self.flush().await?;
            debug!(key, path = %self.path.display(), "file store delete");
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
