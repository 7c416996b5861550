use crate::domain::ports::KeyValueStore;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory key-value store.
///
/// Clones share the same map, so a test can keep a handle to inspect what was
/// persisted. Nothing survives the process.
#[derive(Default, Clone)]
pub struct InMemoryKeyValueStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryKeyValueStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given entries.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(map)),
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryKeyValueStore::new();
        assert!(store.get("vehicle_registration").await.unwrap().is_none());

        store
            .put("vehicle_registration", "BG123AB".to_string())
            .await
            .unwrap();
        assert_eq!(
            store.get("vehicle_registration").await.unwrap().as_deref(),
            Some("BG123AB")
        );
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let store = InMemoryKeyValueStore::with_entries([("a", "1")]);
        let handle = store.clone();
        store.put("b", "2".to_string()).await.unwrap();

        assert_eq!(handle.get("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(handle.get("b").await.unwrap().as_deref(), Some("2"));
    }
}
