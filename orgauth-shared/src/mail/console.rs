//! Console mail transport
//!
//! Writes every message to the log instead of delivering it. Useful in
//! development and for the admin CLI when no real transport is wired in.

use async_trait::async_trait;
use tracing::info;

use super::{MailError, MailMessage, MailTransport, DEFAULT_FROM_EMAIL};

/// Transport that logs messages through `tracing`
#[derive(Debug, Clone)]
pub struct ConsoleTransport {
    default_from: String,
}

impl ConsoleTransport {
    /// Creates a console transport with the given default sender
    pub fn new(default_from: impl Into<String>) -> Self {
        ConsoleTransport {
            default_from: default_from.into(),
        }
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new(DEFAULT_FROM_EMAIL)
    }
}

#[async_trait]
impl MailTransport for ConsoleTransport {
    fn name(&self) -> &str {
        "console"
    }

    fn default_from_email(&self) -> &str {
        &self.default_from
    }

    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        info!(
            from = %message.from_email,
            to = %message.to.join(", "),
            subject = %message.subject,
            has_html = message.html_body.is_some(),
            "{}",
            message.body
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sender() {
        assert_eq!(ConsoleTransport::default().default_from_email(), DEFAULT_FROM_EMAIL);
        assert_eq!(
            ConsoleTransport::new("ops@example.jp").default_from_email(),
            "ops@example.jp"
        );
    }

    #[tokio::test]
    async fn test_send_always_succeeds() {
        let transport = ConsoleTransport::default();
        let message = MailMessage {
            subject: "s".to_string(),
            body: "b".to_string(),
            from_email: DEFAULT_FROM_EMAIL.to_string(),
            to: vec!["to@example.jp".to_string()],
            html_body: None,
        };

        assert!(transport.send(message).await.is_ok());
    }
}
