//! Application layer: the configuration store, the repository that serializes
//! its mutations, voice command resolution and payment dispatch.
//!
//! Data flows one way: `ConfigStore` -> `ConfigRepository` ->
//! `VoiceCommandResolver` -> `PaymentDispatcher` -> the host SMS capability.
//! Cross-component events travel over `tokio` channels.

pub mod dispatcher;
pub mod repository;
pub mod resolver;
pub mod store;
