use crate::application::store::{ConfigStore, Subscription};
use crate::domain::config::{ConfigId, IdGenerator, ParkingConfig};
use crate::domain::registration::RegistrationNumber;
use crate::error::{ParkingError, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const COMMAND_BUFFER: usize = 64;

#[derive(Debug)]
enum Mutation {
    Add(ParkingConfig),
    Remove(ConfigId),
}

struct Command {
    mutation: Mutation,
    reply: oneshot::Sender<Result<()>>,
}

/// Synchronous read access to the latest stored state plus the add/remove
/// mutation API.
///
/// Every configuration-list mutation goes through a single writer task, so
/// mutations issued in quick succession are applied in submission order on
/// top of each other's result and none is lost.
pub struct ConfigRepository {
    store: Arc<ConfigStore>,
    ids: IdGenerator,
    commands: mpsc::Sender<Command>,
    writer: JoinHandle<()>,
}

impl ConfigRepository {
    /// Starts the writer task. Must be called from within a Tokio runtime.
    pub fn spawn(store: Arc<ConfigStore>) -> Self {
        let ids = IdGenerator::seeded_from(&store.configs());
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let writer = tokio::spawn(run_writer(Arc::clone(&store), rx));

        Self {
            store,
            ids,
            commands,
            writer,
        }
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn registration(&self) -> RegistrationNumber {
        self.store.registration()
    }

    pub fn configs(&self) -> Vec<ParkingConfig> {
        self.store.configs()
    }

    pub fn find(&self, id: ConfigId) -> Option<ParkingConfig> {
        self.store.configs().into_iter().find(|c| c.id() == id)
    }

    pub fn observe_registration(&self) -> Subscription<RegistrationNumber> {
        self.store.observe_registration()
    }

    pub fn observe_configs(&self) -> Subscription<Vec<ParkingConfig>> {
        self.store.observe_configs()
    }

    pub async fn save_registration(&self, raw: &str) -> Result<RegistrationNumber> {
        self.store.set_registration(raw).await
    }

    /// Validates user input, assigns a fresh id and adds the new configuration.
    pub async fn create(
        &self,
        city_name: &str,
        zone_name: &str,
        sms_number: &str,
    ) -> Result<ParkingConfig> {
        let config = ParkingConfig::new(self.ids.next_id(), city_name, zone_name, sms_number)?;
        self.add(config.clone()).await?;
        Ok(config)
    }

    /// Appends `config` to the list and persists it.
    ///
    /// Fails with `InvalidConfig` if a configuration with the same id exists.
    pub async fn add(&self, config: ParkingConfig) -> Result<()> {
        self.submit(Mutation::Add(config)).await
    }

    /// Removes every configuration with `id`. Removing an absent id is a no-op.
    pub async fn remove(&self, id: ConfigId) -> Result<()> {
        self.submit(Mutation::Remove(id)).await
    }

    async fn submit(&self, mutation: Mutation) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command { mutation, reply })
            .await
            .map_err(|_| ParkingError::ShuttingDown)?;
        response.await.map_err(|_| ParkingError::ShuttingDown)?
    }

    /// Stops accepting mutations and waits for the queued ones to be written.
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(e) = self.writer.await {
            warn!(error = %e, "configuration writer task failed");
        }
    }
}

async fn run_writer(store: Arc<ConfigStore>, mut commands: mpsc::Receiver<Command>) {
    debug!("configuration writer started");

    while let Some(Command { mutation, reply }) = commands.recv().await {
        let result = apply(&store, &mutation).await;
        if let Err(e) = &result {
            warn!(?mutation, error = %e, "configuration update failed");
            if matches!(e, ParkingError::Storage(_) | ParkingError::Io(_))
                && let Err(e) = store.reload_configs().await
            {
                warn!(error = %e, "cannot resynchronize, keeping last persisted list");
            }
        }
        // The caller may have stopped waiting; the write stands regardless.
        let _ = reply.send(result);
    }

    debug!("configuration writer stopped");
}

async fn apply(store: &ConfigStore, mutation: &Mutation) -> Result<()> {
    let mut configs = store.configs();

    match mutation {
        Mutation::Add(config) => {
            if configs.iter().any(|c| c.id() == config.id()) {
                return Err(ParkingError::InvalidConfig(format!(
                    "id {} is already in use",
                    config.id()
                )));
            }
            configs.push(config.clone());
            store.set_configs(configs).await?;
            info!(id = %config.id(), city = config.city_name(), zone = config.zone_name(), "configuration added");
        }
        Mutation::Remove(id) => {
            let before = configs.len();
            configs.retain(|c| c.id() != *id);
            if configs.len() == before {
                debug!(%id, "nothing to remove");
                return Ok(());
            }
            store.set_configs(configs).await?;
            info!(%id, "configuration removed");
        }
    }

    Ok(())
}
