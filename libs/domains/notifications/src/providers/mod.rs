//! Email provider implementations.
//!
//! `EmailProvider` is the only seam the rest of the workspace sees; tests
//! substitute their own implementation.

mod resend;

pub use resend::{ResendConfig, ResendProvider};

use crate::error::NotificationResult;
use crate::templates::RenderedEmail;
use async_trait::async_trait;

/// Provider acknowledgement for an accepted email.
#[derive(Debug, Clone, Default)]
pub struct SentEmail {
    /// Provider-specific message ID for tracking.
    pub message_id: Option<String>,
}

/// Email content ready for sending.
#[derive(Debug, Clone, Default)]
pub struct EmailContent {
    /// Recipient email address.
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
    /// Overrides the provider's default sender.
    pub from: Option<String>,
}

impl EmailContent {
    pub fn from_rendered(to: impl Into<String>, rendered: RenderedEmail) -> Self {
        Self {
            to: to.into(),
            subject: rendered.subject,
            html: rendered.html,
            text: rendered.text,
            from: None,
        }
    }
}

/// Trait for email sending providers.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send an email. `Err` means the message was not accepted.
    async fn send(&self, email: &EmailContent) -> NotificationResult<SentEmail>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}
