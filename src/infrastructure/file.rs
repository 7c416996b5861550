use crate::domain::ports::KeyValueStore;
use crate::error::{ParkingError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// File name of the preferences file inside the data directory.
pub const SETTINGS_FILE: &str = "settings.json";

/// A persistent key-value store backed by a single JSON preferences file.
///
/// Every `put` rewrites the whole file through a temporary file in the same
/// directory that is then renamed over the original, so readers never see a
/// half-written file.
#[derive(Clone)]
pub struct FileKeyValueStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    write_lock: Arc<Mutex<()>>,
}

impl FileKeyValueStore {
    /// Opens (creating if missing) the data directory at `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|e| ParkingError::Storage(format!("cannot create {}: {}", dir.display(), e)))?;

        Ok(Self {
            path: dir.join(SETTINGS_FILE),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    async fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(ParkingError::Storage(format!(
                "cannot read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.read_entries().await?;
        Ok(entries.remove(key))
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut entries = match self.read_entries().await {
            Ok(entries) => entries,
            Err(ParkingError::Serialization(e)) => {
                warn!(path = %self.path.display(), error = %e, "discarding unreadable settings file");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        entries.insert(key.to_string(), value);
        let contents = serde_json::to_vec_pretty(&entries)?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &contents))
            .await
            .map_err(|e| ParkingError::Storage(format!("write task failed: {}", e)))?
            .map_err(|e| {
                ParkingError::Storage(format!("cannot write {}: {}", self.path.display(), e))
            })?;

        debug!(key, path = %self.path.display(), "persisted entry");
        Ok(())
    }
}
