use crate::domain::ports::KeyValueStore;
use crate::error::{ParkingError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family holding the application settings entries.
pub const CF_SETTINGS: &str = "settings";

/// A persistent key-value store implementation using RocksDB.
///
/// Each entry is a single `put_cf`, which RocksDB applies atomically.
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring the
    /// settings column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_settings = ColumnFamilyDescriptor::new(CF_SETTINGS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_settings])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn settings(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(CF_SETTINGS)
            .ok_or_else(|| ParkingError::Storage("Settings column family not found".to_string()))
    }
}

#[async_trait]
impl KeyValueStore for RocksDBStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let cf = self.settings()?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| ParkingError::Storage(format!("Entry {} is not UTF-8: {}", key, e))),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        let cf = self.settings()?;
        self.db.put_cf(cf, key.as_bytes(), value.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");
        assert!(store.db.cf_handle(CF_SETTINGS).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_persists_across_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            store
                .put("vehicle_registration", "BG123AB".to_string())
                .await
                .unwrap();
        }

        let store = RocksDBStore::open(dir.path()).unwrap();
        assert_eq!(
            store.get("vehicle_registration").await.unwrap().as_deref(),
            Some("BG123AB")
        );
        assert!(store.get("parking_configs").await.unwrap().is_none());
    }
}
