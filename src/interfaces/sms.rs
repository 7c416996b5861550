use crate::domain::ports::SmsGateway;
use crate::error::{ParkingError, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Prints the message instead of sending it. Used when no SMS program is
/// configured.
#[derive(Debug, Default, Clone)]
pub struct ConsoleSmsGateway;

#[async_trait]
impl SmsGateway for ConsoleSmsGateway {
    async fn send_sms(&self, destination: &str, body: &str) -> Result<()> {
        println!("SMS to {}: {}", destination, body);
        Ok(())
    }
}

/// Sends SMS through an external program, e.g. `termux-sms-send -n {destination} {body}`.
///
/// Arguments may contain the `{destination}` and `{body}` placeholders. If
/// neither appears, the destination and body are appended as the last two
/// arguments.
#[derive(Debug, Clone)]
pub struct CommandSmsGateway {
    program: String,
    args: Vec<String>,
}

impl CommandSmsGateway {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Splits a command line on whitespace. Placeholders are substituted per
    /// argument, so a body containing spaces stays a single argument.
    pub fn from_command_line(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| ParkingError::SendFailed("empty SMS command".to_string()))?;
        Ok(Self::new(program, parts.collect()))
    }

    fn arguments(&self, destination: &str, body: &str) -> Vec<String> {
        let templated = self
            .args
            .iter()
            .any(|a| a.contains("{destination}") || a.contains("{body}"));

        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace("{destination}", destination).replace("{body}", body))
            .collect();
        if !templated {
            args.push(destination.to_string());
            args.push(body.to_string());
        }
        args
    }
}

#[async_trait]
impl SmsGateway for CommandSmsGateway {
    async fn send_sms(&self, destination: &str, body: &str) -> Result<()> {
        let args = self.arguments(destination, body);
        debug!(program = %self.program, ?args, "running SMS command");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| ParkingError::SendFailed(format!("cannot run {}: {}", self.program, e)))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match stderr.trim() {
                "" => format!("{} exited with {}", self.program, output.status),
                message => message.to_string(),
            };
            Err(ParkingError::SendFailed(reason))
        }
    }
}
