use crate::domain::config::{ParkingConfig, decode_configs, encode_configs};
use crate::domain::ports::KeyValueStoreBox;
use crate::domain::registration::RegistrationNumber;
use crate::error::{ParkingError, Result};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

/// Storage key of the vehicle registration number.
pub const REGISTRATION_KEY: &str = "vehicle_registration";
/// Storage key of the JSON-encoded configuration list.
pub const CONFIGS_KEY: &str = "parking_configs";

/// A "replay latest, then stream updates" view of a stored value.
///
/// The first call to [`Subscription::next`] yields the current value
/// immediately; later calls wait for the next successful write. Intermediate
/// values written faster than the subscriber reads are coalesced into the
/// most recent one. The stream only ends once the owning store is dropped.
pub struct Subscription<T> {
    rx: watch::Receiver<T>,
    primed: bool,
}

impl<T: Clone> Subscription<T> {
    fn new(rx: watch::Receiver<T>) -> Self {
        Self { rx, primed: false }
    }

    pub async fn next(&mut self) -> Option<T> {
        if self.primed {
            self.rx.changed().await.ok()?;
        }
        self.primed = true;
        Some(self.rx.borrow_and_update().clone())
    }

    /// The latest value, without consuming a notification.
    pub fn latest(&self) -> T {
        self.rx.borrow().clone()
    }
}

/// Durable storage of the registration number and the configuration list,
/// with change notification.
///
/// The store is the only writer to the backing medium. Writes to the same key
/// never overlap; the two keys are independent and may be written
/// concurrently. Subscribers are notified only after a write was persisted.
pub struct ConfigStore {
    backend: KeyValueStoreBox,
    registration_tx: watch::Sender<RegistrationNumber>,
    configs_tx: watch::Sender<Vec<ParkingConfig>>,
    registration_lock: Mutex<()>,
    configs_lock: Mutex<()>,
}

impl ConfigStore {
    /// Loads the current state from `backend`.
    ///
    /// Opening never fails: an unreadable registration starts out unset and
    /// an unreadable or corrupt configuration list starts out empty.
    pub async fn open(backend: KeyValueStoreBox) -> Self {
        let registration = load_registration(&backend).await;
        let configs = read_configs(&backend).await.unwrap_or_else(|e| {
            warn!(error = %e, "cannot read parking configurations, starting empty");
            Vec::new()
        });
        info!(
            registration_set = !registration.is_blank(),
            configs = configs.len(),
            "configuration store opened"
        );

        Self {
            backend,
            registration_tx: watch::Sender::new(registration),
            configs_tx: watch::Sender::new(configs),
            registration_lock: Mutex::new(()),
            configs_lock: Mutex::new(()),
        }
    }

    pub fn observe_registration(&self) -> Subscription<RegistrationNumber> {
        Subscription::new(self.registration_tx.subscribe())
    }

    pub fn observe_configs(&self) -> Subscription<Vec<ParkingConfig>> {
        Subscription::new(self.configs_tx.subscribe())
    }

    pub fn registration(&self) -> RegistrationNumber {
        self.registration_tx.borrow().clone()
    }

    pub fn configs(&self) -> Vec<ParkingConfig> {
        self.configs_tx.borrow().clone()
    }

    /// Normalizes and persists the registration number, returning the stored form.
    pub async fn set_registration(&self, raw: &str) -> Result<RegistrationNumber> {
        let registration = RegistrationNumber::new(raw);
        let _guard = self.registration_lock.lock().await;

        self.backend
            .put(REGISTRATION_KEY, registration.as_str().to_string())
            .await?;
        self.registration_tx.send_replace(registration.clone());

        debug!(%registration, "registration saved");
        Ok(registration)
    }

    /// Replaces the whole configuration list.
    pub async fn set_configs(&self, configs: Vec<ParkingConfig>) -> Result<()> {
        let encoded = encode_configs(&configs)?;
        let _guard = self.configs_lock.lock().await;

        self.backend.put(CONFIGS_KEY, encoded).await?;
        debug!(configs = configs.len(), "configuration list saved");
        self.configs_tx.send_replace(configs);
        Ok(())
    }

    /// Re-reads the configuration list from the medium and republishes it.
    ///
    /// Used to resynchronize after a failed write. If the medium cannot be
    /// read the current snapshot, which is the last successfully persisted
    /// list, stays published and the read error is returned.
    pub async fn reload_configs(&self) -> Result<Vec<ParkingConfig>> {
        let _guard = self.configs_lock.lock().await;
        let configs = read_configs(&self.backend).await?;
        self.configs_tx.send_replace(configs.clone());
        Ok(configs)
    }
}

async fn load_registration(backend: &KeyValueStoreBox) -> RegistrationNumber {
    match backend.get(REGISTRATION_KEY).await {
        Ok(value) => RegistrationNumber::from_stored(value.unwrap_or_default()),
        Err(e) => {
            warn!(error = %e, "cannot read registration, treating it as unset");
            RegistrationNumber::default()
        }
    }
}

/// Reads the stored list. Fails only when the medium cannot be read; stored
/// data that reads back corrupt decodes to the empty list.
async fn read_configs(backend: &KeyValueStoreBox) -> Result<Vec<ParkingConfig>> {
    let raw = match backend.get(CONFIGS_KEY).await {
        Ok(raw) => raw.unwrap_or_default(),
        Err(ParkingError::Serialization(e)) => {
            warn!(error = %e, "stored settings are corrupt, starting empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    Ok(decode_configs(&raw).unwrap_or_else(|e| {
        warn!(error = %e, "stored parking configurations are corrupt, starting empty");
        Vec::new()
    }))
}
