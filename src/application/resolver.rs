use crate::application::store::{ConfigStore, Subscription};
use crate::domain::config::ParkingConfig;
use crate::error::{ParkingError, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Where a payment request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentSource {
    /// The user picked the configuration directly.
    User,
    /// An external assistant asked for a city and zone.
    VoiceCommand,
}

/// A request to pay for parking with one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub config: ParkingConfig,
    pub source: PaymentSource,
}

/// Finds the first configuration whose city and zone contain the query texts,
/// ignoring case.
///
/// A missing or blank city or zone never matches. When several records
/// qualify the earliest in stored order wins; ambiguity is not reported.
pub fn find_match<'a>(
    configs: &'a [ParkingConfig],
    city: Option<&str>,
    zone: Option<&str>,
) -> Option<&'a ParkingConfig> {
    let city = city.filter(|c| !c.trim().is_empty())?.to_lowercase();
    let zone = zone.filter(|z| !z.trim().is_empty())?.to_lowercase();

    configs.iter().find(|config| {
        config.city_name().to_lowercase().contains(&city)
            && config.zone_name().to_lowercase().contains(&zone)
    })
}

/// Resolves voice commands against the current configuration list and
/// publishes a matching configuration as a [`PaymentRequest`].
///
/// Commands arrive at arbitrary times relative to whoever processes payments,
/// so a match is delivered as an event rather than returned to the caller.
pub struct VoiceCommandResolver {
    configs: Subscription<Vec<ParkingConfig>>,
    requests: mpsc::Sender<PaymentRequest>,
}

impl VoiceCommandResolver {
    pub fn new(store: &ConfigStore, requests: mpsc::Sender<PaymentRequest>) -> Self {
        Self {
            configs: store.observe_configs(),
            requests,
        }
    }

    /// Looks up the match without publishing it.
    pub fn resolve(&self, city: Option<&str>, zone: Option<&str>) -> Option<ParkingConfig> {
        let configs = self.configs.latest();
        find_match(&configs, city, zone).cloned()
    }

    /// Resolves the command and, on a match, publishes one payment request.
    ///
    /// Returns the matched configuration; `None` means nothing was published.
    pub async fn submit(
        &self,
        city: Option<&str>,
        zone: Option<&str>,
    ) -> Result<Option<ParkingConfig>> {
        let Some(config) = self.resolve(city, zone) else {
            debug!(?city, ?zone, "voice command matched no configuration");
            return Ok(None);
        };

        info!(id = %config.id(), ?city, ?zone, "voice command resolved");
        self.requests
            .send(PaymentRequest {
                config: config.clone(),
                source: PaymentSource::VoiceCommand,
            })
            .await
            .map_err(|_| ParkingError::ShuttingDown)?;
        Ok(Some(config))
    }
}
