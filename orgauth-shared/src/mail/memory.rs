//! In-memory mail transport for tests
//!
//! Messages are appended to an outbox instead of being delivered. A failure
//! can be queued with [`MemoryTransport::fail_next`] to exercise error paths.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{MailError, MailMessage, MailTransport};

/// Transport that records messages in memory
#[derive(Debug, Default)]
pub struct MemoryTransport {
    default_from: String,
    outbox: Mutex<Vec<MailMessage>>,
    pending_failure: Mutex<Option<String>>,
}

impl MemoryTransport {
    /// Creates an empty transport with the given default sender
    pub fn new(default_from: impl Into<String>) -> Self {
        MemoryTransport {
            default_from: default_from.into(),
            outbox: Mutex::new(Vec::new()),
            pending_failure: Mutex::new(None),
        }
    }

    /// Returns a copy of every message sent so far
    pub async fn outbox(&self) -> Vec<MailMessage> {
        self.outbox.lock().await.clone()
    }

    /// Makes the next `send` fail with `MailError::Delivery(reason)`
    pub async fn fail_next(&self, reason: impl Into<String>) {
        *self.pending_failure.lock().await = Some(reason.into());
    }

    /// Empties the outbox
    pub async fn clear(&self) {
        self.outbox.lock().await.clear();
    }
}

#[async_trait]
impl MailTransport for MemoryTransport {
    fn name(&self) -> &str {
        "memory"
    }

    fn default_from_email(&self) -> &str {
        &self.default_from
    }

    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        if let Some(reason) = self.pending_failure.lock().await.take() {
            return Err(MailError::Delivery(reason));
        }

        self.outbox.lock().await.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> MailMessage {
        MailMessage {
            subject: "s".to_string(),
            body: "b".to_string(),
            from_email: "from@example.jp".to_string(),
            to: vec!["to@example.jp".to_string()],
            html_body: None,
        }
    }

    #[tokio::test]
    async fn test_records_messages() {
        let transport = MemoryTransport::new("from@example.jp");
        transport.send(message()).await.expect("Send should succeed");
        transport.send(message()).await.expect("Send should succeed");

        assert_eq!(transport.outbox().await.len(), 2);

        transport.clear().await;
        assert!(transport.outbox().await.is_empty());
    }

    #[tokio::test]
    async fn test_failure_applies_once() {
        let transport = MemoryTransport::new("from@example.jp");
        transport.fail_next("boom").await;

        assert!(transport.send(message()).await.is_err());
        assert!(transport.send(message()).await.is_ok());
        assert_eq!(transport.outbox().await.len(), 1);
    }
}
