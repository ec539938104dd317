use domain_notifications::{
    EmailContent, EmailProvider, TemplateEngine, VerificationEmailData,
};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{RegistrationError, RegistrationResult};
use crate::token::TOKEN_TTL_HOURS;

/// Settings for building verification links.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// Public site URL, e.g. `https://mu.example.com`.
    pub base_url: String,
    /// Shown in the subject and greeting.
    pub server_name: String,
}

/// Renders and sends the verification email for a pending account.
#[derive(Clone)]
pub struct VerificationMailer {
    provider: Arc<dyn EmailProvider>,
    templates: TemplateEngine,
    config: MailerConfig,
}

impl VerificationMailer {
    pub fn new(
        provider: Arc<dyn EmailProvider>,
        templates: TemplateEngine,
        config: MailerConfig,
    ) -> RegistrationResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(RegistrationError::Config(
                "base URL for verification links is empty".to_string(),
            ));
        }

        Ok(Self {
            provider,
            templates,
            config,
        })
    }

    pub fn verification_url(&self, token: &str) -> String {
        format!(
            "{}/verify-email?token={}",
            self.config.base_url.trim_end_matches('/'),
            token
        )
    }

    #[instrument(skip(self, token), fields(provider = self.provider.name()))]
    pub async fn send_verification(
        &self,
        username: &str,
        email: &str,
        token: &str,
    ) -> RegistrationResult<()> {
        let rendered = self.templates.render_verification(&VerificationEmailData {
            username: username.to_string(),
            server_name: self.config.server_name.clone(),
            verification_url: self.verification_url(token),
            expiry_hours: TOKEN_TTL_HOURS,
        })?;

        let sent = self
            .provider
            .send(&EmailContent::from_rendered(email, rendered))
            .await?;

        debug!(message_id = ?sent.message_id, "Verification email accepted");
        Ok(())
    }
}
