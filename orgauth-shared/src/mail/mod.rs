//! Mail transport abstraction
//!
//! Outgoing mail goes through a [`MailTransport`]. The transport decides how
//! a message is delivered; this crate only builds messages and hands them
//! over. Two transports are bundled:
//!
//! - [`ConsoleTransport`]: writes messages to the log, for development
//! - [`MemoryTransport`]: keeps an outbox in memory, for tests
//!
//! # Example
//!
//! ```
//! use orgauth_shared::mail::{send_mail, MailOptions, MemoryTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = MemoryTransport::new("noreply@example.jp");
//!
//! let sent = send_mail(
//!     &transport,
//!     "Welcome",
//!     "Your account is ready.",
//!     None,
//!     &["taro@example.jp"],
//!     MailOptions::default(),
//! )
//! .await?;
//!
//! assert_eq!(sent, 1);
//! # Ok(())
//! # }
//! ```

pub mod console;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use console::ConsoleTransport;
pub use memory::MemoryTransport;

/// Sender used when neither the caller nor the transport names one
pub const DEFAULT_FROM_EMAIL: &str = "webmaster@localhost";

/// Mail transport errors
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// The message has no recipients
    #[error("Message has no recipients")]
    NoRecipients,

    /// The transport could not deliver the message
    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// A single outgoing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    /// Subject line
    pub subject: String,

    /// Plain-text body
    pub body: String,

    /// Sender address
    pub from_email: String,

    /// Recipient addresses
    pub to: Vec<String>,

    /// Optional HTML alternative of the body
    pub html_body: Option<String>,
}

/// Per-call delivery options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailOptions {
    /// Swallow transport failures and report zero messages sent
    #[serde(default)]
    pub fail_silently: bool,

    /// HTML alternative of the body
    #[serde(default)]
    pub html_message: Option<String>,
}

/// Delivers messages
///
/// Implementations send synchronously from the caller's point of view: when
/// `send` returns `Ok`, the message has been handed off. No retries or
/// queueing happen at this layer.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Returns the transport name (for logging)
    fn name(&self) -> &str;

    /// Sender used when a message does not specify one
    fn default_from_email(&self) -> &str {
        DEFAULT_FROM_EMAIL
    }

    /// Sends one message
    async fn send(&self, message: MailMessage) -> Result<(), MailError>;
}

/// Builds a message and sends it through `transport`
///
/// `from_email` falls back to [`MailTransport::default_from_email`].
///
/// # Returns
///
/// Number of messages sent: 1 on success, 0 if delivery failed with
/// `options.fail_silently` set
///
/// # Errors
///
/// Returns `MailError::NoRecipients` for an empty recipient list, and the
/// transport's error unchanged when delivery fails.
pub async fn send_mail<T>(
    transport: &T,
    subject: &str,
    message: &str,
    from_email: Option<&str>,
    recipients: &[&str],
    options: MailOptions,
) -> Result<usize, MailError>
where
    T: MailTransport + ?Sized,
{
    if recipients.is_empty() {
        return Err(MailError::NoRecipients);
    }

    let mail = MailMessage {
        subject: subject.to_string(),
        body: message.to_string(),
        from_email: from_email
            .unwrap_or_else(|| transport.default_from_email())
            .to_string(),
        to: recipients.iter().map(|r| r.to_string()).collect(),
        html_body: options.html_message,
    };

    debug!(
        transport = transport.name(),
        recipients = mail.to.len(),
        "Sending mail"
    );

    match transport.send(mail).await {
        Ok(()) => Ok(1),
        Err(e) if options.fail_silently => {
            warn!(transport = transport.name(), error = %e, "Mail delivery failed silently");
            Ok(0)
        }
        Err(e) => Err(e),
    }
}
