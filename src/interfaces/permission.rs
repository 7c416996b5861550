use crate::domain::ports::{Capability, PermissionProvider};
use async_trait::async_trait;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Answers every permission check the same way. `--yes` grants everything.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermissions(pub bool);

#[async_trait]
impl PermissionProvider for StaticPermissions {
    async fn is_granted(&self, _capability: Capability) -> bool {
        self.0
    }

    async fn request(&self, _capability: Capability) -> bool {
        self.0
    }
}

/// Asks on the terminal and remembers a grant for the rest of the process.
#[derive(Debug, Default)]
pub struct TerminalPrompt {
    sms_granted: AtomicBool,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self::default()
    }
}

fn describe(capability: Capability) -> &'static str {
    match capability {
        Capability::SendSms => "send SMS messages",
    }
}

fn ask(question: String) -> io::Result<bool> {
    let mut stderr = io::stderr().lock();
    write!(stderr, "{} [y/N] ", question)?;
    stderr.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[async_trait]
impl PermissionProvider for TerminalPrompt {
    async fn is_granted(&self, capability: Capability) -> bool {
        match capability {
            Capability::SendSms => self.sms_granted.load(Ordering::SeqCst),
        }
    }

    async fn request(&self, capability: Capability) -> bool {
        let question = format!("Allow plati-parking to {}?", describe(capability));
        let granted = match tokio::task::spawn_blocking(move || ask(question)).await {
            Ok(Ok(granted)) => granted,
            Ok(Err(e)) => {
                warn!(error = %e, "cannot read permission answer, denying");
                false
            }
            Err(e) => {
                warn!(error = %e, "permission prompt failed, denying");
                false
            }
        };

        if granted {
            match capability {
                Capability::SendSms => self.sms_granted.store(true, Ordering::SeqCst),
            }
        }
        granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_permissions() {
        assert!(StaticPermissions(true).is_granted(Capability::SendSms).await);
        assert!(!StaticPermissions(false).request(Capability::SendSms).await);
    }

    #[tokio::test]
    async fn test_prompt_starts_ungranted() {
        assert!(!TerminalPrompt::new().is_granted(Capability::SendSms).await);
    }
}
