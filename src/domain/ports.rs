use crate::error::Result;
use async_trait::async_trait;

/// Durable string-keyed storage medium.
///
/// A single `put` must be atomic: readers observe either the previous value
/// or the new one, never a partial write.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: String) -> Result<()>;
}

/// Host capabilities guarded by a runtime permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    SendSms,
}

/// The host permission subsystem.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    async fn is_granted(&self, capability: Capability) -> bool;
    /// Asks the user for the capability. Resolves once they answer; there is
    /// no timeout.
    async fn request(&self, capability: Capability) -> bool;
}

/// Outbound SMS capability of the host platform.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Fire-and-forget send. An error carries the reason reported by the host.
    async fn send_sms(&self, destination: &str, body: &str) -> Result<()>;
}

pub type KeyValueStoreBox = Box<dyn KeyValueStore>;
pub type PermissionProviderBox = Box<dyn PermissionProvider>;
pub type SmsGatewayBox = Box<dyn SmsGateway>;
