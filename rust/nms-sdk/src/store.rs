use crate::stream::StoreStream;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

const UPDATE_CHANNEL_CAPACITY: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreUpdate<T> {
    Upsert {
        key: String,
        data: T,
        previous: Option<T>,
    },
    Delete {
        key: String,
        previous: T,
    },
    /// The whole map was swapped; `len` is the new entry count.
    Replaced { len: usize },
}

impl<T> StoreUpdate<T> {
    pub fn key(&self) -> Option<&str> {
        match self {
            StoreUpdate::Upsert { key, .. } | StoreUpdate::Delete { key, .. } => Some(key),
            StoreUpdate::Replaced { .. } => None,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, StoreUpdate::Delete { .. })
    }
}

/// Key to value map shared between the query and mutation paths.
///
/// Every write holds the lock until the map is consistent, so a read issued
/// after a write returns never observes the old value.
pub struct KeyedStore<T> {
    data: Arc<RwLock<HashMap<String, T>>>,
    update_tx: broadcast::Sender<StoreUpdate<T>>,
}

impl<T> KeyedStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        let (update_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            update_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreUpdate<T>> {
        self.update_tx.subscribe()
    }

    /// Stream of changes, for re-rendering after writes.
    pub fn watch(&self) -> StoreStream<T> {
        StoreStream::new(self.subscribe())
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        self.data.read().await.get(key).cloned()
    }

    /// Cached value without waiting; `None` if the lock is held by a writer.
    pub fn get_sync(&self, key: &str) -> Option<T> {
        self.data.try_read().ok()?.get(key).cloned()
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        self.data.read().await.contains_key(key)
    }

    pub async fn all(&self) -> HashMap<String, T> {
        self.data.read().await.clone()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.data.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    pub async fn replace_all(&self, entries: HashMap<String, T>) {
        let mut data = self.data.write().await;
        let len = entries.len();
        *data = entries;
        tracing::debug!("store replaced: {} entries", len);
        let _ = self.update_tx.send(StoreUpdate::Replaced { len });
    }

    pub async fn upsert(&self, key: impl Into<String>, value: T) -> Option<T> {
        let key = key.into();
        let mut data = self.data.write().await;
        let previous = data.insert(key.clone(), value.clone());
        let _ = self.update_tx.send(StoreUpdate::Upsert {
            key,
            data: value,
            previous: previous.clone(),
        });
        previous
    }

    /// Remove `key`; absent keys are a no-op and broadcast nothing.
    pub async fn remove(&self, key: &str) -> Option<T> {
        let mut data = self.data.write().await;
        let previous = data.remove(key)?;
        let _ = self.update_tx.send(StoreUpdate::Delete {
            key: key.to_string(),
            previous: previous.clone(),
        });
        Some(previous)
    }
}

impl<T> Default for KeyedStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for KeyedStore<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            update_tx: self.update_tx.clone(),
        }
    }
}
