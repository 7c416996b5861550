#![allow(dead_code)]

use async_trait::async_trait;
use plati_parking::domain::config::{ConfigId, ParkingConfig};
use plati_parking::domain::ports::{Capability, KeyValueStore, PermissionProvider, SmsGateway};
use plati_parking::error::{ParkingError, Result};
use plati_parking::infrastructure::in_memory::InMemoryKeyValueStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, oneshot};

pub fn config(id: i64, city: &str, zone: &str, sms: &str) -> ParkingConfig {
    ParkingConfig::new(ConfigId(id), city, zone, sms).unwrap()
}

/// In-memory store whose writes, or all access, can be switched off to
/// simulate an unavailable medium.
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: InMemoryKeyValueStore,
    fail_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    /// Fails reads as well as writes.
    pub fn set_down(&self, down: bool) {
        self.fail_writes.store(down, Ordering::SeqCst);
        self.fail_reads.store(down, Ordering::SeqCst);
    }

    pub async fn raw(&self, key: &str) -> Option<String> {
        self.inner.get(key).await.unwrap()
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ParkingError::Storage("medium unavailable".to_string()));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        // Yield so concurrent writers really interleave.
        tokio::task::yield_now().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ParkingError::Storage("medium unavailable".to_string()));
        }
        self.inner.put(key, value).await
    }
}

/// Records every SMS handed to it.
#[derive(Clone, Default)]
pub struct RecordingSms {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    fail_with: Option<String>,
}

impl RecordingSms {
    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsGateway for RecordingSms {
    async fn send_sms(&self, destination: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), body.to_string()));
        match &self.fail_with {
            Some(reason) => Err(ParkingError::SendFailed(reason.clone())),
            None => Ok(()),
        }
    }
}

/// Permission subsystem whose prompt stays open until the test answers it.
#[derive(Clone, Default)]
pub struct PromptedPermissions {
    granted: Arc<AtomicBool>,
    prompts: Arc<AtomicUsize>,
    pending: Arc<Mutex<Option<oneshot::Sender<bool>>>>,
    prompted: Arc<Notify>,
}

impl PromptedPermissions {
    pub fn granted() -> Self {
        let permissions = Self::default();
        permissions.granted.store(true, Ordering::SeqCst);
        permissions
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    /// Waits for the prompt to appear, then answers it.
    pub async fn answer(&self, grant: bool) {
        loop {
            let notified = self.prompted.notified();
            if let Some(reply) = self.pending.lock().unwrap().take() {
                reply.send(grant).unwrap();
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl PermissionProvider for PromptedPermissions {
    async fn is_granted(&self, _capability: Capability) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    async fn request(&self, _capability: Capability) -> bool {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        let (reply, answer) = oneshot::channel();
        *self.pending.lock().unwrap() = Some(reply);
        self.prompted.notify_waiters();

        let granted = answer.await.unwrap_or(false);
        self.granted.store(granted, Ordering::SeqCst);
        granted
    }
}
