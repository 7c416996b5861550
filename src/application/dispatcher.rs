use crate::application::resolver::PaymentRequest;
use crate::application::store::{ConfigStore, Subscription};
use crate::domain::config::{ConfigId, ParkingConfig};
use crate::domain::ports::{Capability, PermissionProviderBox, SmsGatewayBox};
use crate::domain::registration::RegistrationNumber;
use crate::error::{ParkingError, Result};
use std::fmt;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{info, warn};

/// Where the dispatcher is in handling a payment.
///
/// The terminal result of a payment is carried by its [`PaymentOutcome`];
/// the published state goes straight back to `Idle` once the outcome is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchState {
    #[default]
    Idle,
    ValidatingPreconditions,
    /// Waiting for the host permission subsystem, possibly on a user prompt.
    PermissionCheck,
    Sending,
}

/// Result of one payment attempt, meant to be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Sent {
        config: ConfigId,
        destination: String,
    },
    MissingRegistration,
    PermissionDenied,
    Failed(String),
}

impl PaymentOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }

    /// Converts a non-sent outcome into the matching error kind.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Sent { .. } => Ok(()),
            Self::MissingRegistration => Err(ParkingError::MissingRegistration),
            Self::PermissionDenied => Err(ParkingError::PermissionDenied),
            Self::Failed(reason) => Err(ParkingError::SendFailed(reason)),
        }
    }
}

impl PaymentOutcome {
    /// The notification text shown to the user.
    pub fn message(&self) -> String {
        match self {
            Self::Sent { destination, .. } => {
                format!("Parking payment SMS sent to {}", destination)
            }
            Self::MissingRegistration => {
                "Please set the vehicle registration number first".to_string()
            }
            Self::PermissionDenied => "Permission denied. Cannot send the SMS.".to_string(),
            Self::Failed(reason) => format!("Sending the SMS failed: {}", reason),
        }
    }
}

impl fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Resets the published state to `Idle` however a dispatch ends.
struct IdleOnDrop<'a>(&'a watch::Sender<DispatchState>);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_replace(DispatchState::Idle);
    }
}

/// Turns a parking configuration plus the current registration number into
/// exactly one outbound SMS.
///
/// Payments are handled one at a time. A send is attempted at most once per
/// payment; failures are reported and never retried, since every SMS costs
/// the user money.
pub struct PaymentDispatcher {
    registration: Subscription<RegistrationNumber>,
    permissions: PermissionProviderBox,
    sms: SmsGatewayBox,
    state: watch::Sender<DispatchState>,
    in_flight: Mutex<()>,
}

impl PaymentDispatcher {
    pub fn new(store: &ConfigStore, permissions: PermissionProviderBox, sms: SmsGatewayBox) -> Self {
        Self {
            registration: store.observe_registration(),
            permissions,
            sms,
            state: watch::Sender::new(DispatchState::Idle),
            in_flight: Mutex::new(()),
        }
    }

    pub fn state(&self) -> watch::Receiver<DispatchState> {
        self.state.subscribe()
    }

    /// Pays for parking with `config`.
    pub async fn pay(&self, config: &ParkingConfig) -> PaymentOutcome {
        let _serial = self.in_flight.lock().await;
        let _idle = IdleOnDrop(&self.state);

        self.state.send_replace(DispatchState::ValidatingPreconditions);
        let registration = self.registration.latest();
        if registration.is_blank() {
            warn!(id = %config.id(), "payment aborted, registration number not set");
            return PaymentOutcome::MissingRegistration;
        }

        self.state.send_replace(DispatchState::PermissionCheck);
        if !self.permissions.is_granted(Capability::SendSms).await {
            info!("requesting SMS permission");
            if !self.permissions.request(Capability::SendSms).await {
                warn!(id = %config.id(), "payment aborted, SMS permission denied");
                return PaymentOutcome::PermissionDenied;
            }
        }

        self.state.send_replace(DispatchState::Sending);
        match self
            .sms
            .send_sms(config.sms_number(), registration.as_str())
            .await
        {
            Ok(()) => {
                info!(id = %config.id(), destination = config.sms_number(), "payment SMS sent");
                PaymentOutcome::Sent {
                    config: config.id(),
                    destination: config.sms_number().to_string(),
                }
            }
            Err(e) => {
                let reason = match e {
                    ParkingError::SendFailed(reason) => reason,
                    other => other.to_string(),
                };
                warn!(id = %config.id(), %reason, "payment SMS failed");
                PaymentOutcome::Failed(reason)
            }
        }
    }

    /// Handles payment requests until the request channel closes, reporting
    /// each outcome on `outcomes`.
    pub async fn run(
        self,
        mut requests: mpsc::Receiver<PaymentRequest>,
        outcomes: mpsc::Sender<PaymentOutcome>,
    ) {
        while let Some(request) = requests.recv().await {
            info!(id = %request.config.id(), source = ?request.source, "payment requested");
            let outcome = self.pay(&request.config).await;
            if outcomes.send(outcome).await.is_err() {
                warn!("outcome receiver dropped, stopping payment dispatcher");
                break;
            }
        }
    }
}
