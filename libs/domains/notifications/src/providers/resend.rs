//! Resend email provider implementation.

use super::{EmailContent, EmailProvider, SentEmail};
use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// Resend API configuration.
#[derive(Debug, Clone)]
pub struct ResendConfig {
    pub api_key: String,
    /// Default sender, e.g. `"MuOnline <noreply@example.com>"`.
    pub from: String,
    /// Resend API base URL (defaults to production).
    pub api_url: String,
}

impl ResendConfig {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            api_key,
            from,
            api_url: "https://api.resend.com".to_string(),
        }
    }

    /// `RESEND_API_KEY` is required; `EMAIL_FROM` falls back to Resend's shared test sender.
    pub fn from_env() -> NotificationResult<Self> {
        let api_key = std::env::var("RESEND_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| NotificationError::ConfigError("RESEND_API_KEY not set".to_string()))?;
        let from = std::env::var("EMAIL_FROM")
            .unwrap_or_else(|_| "onboarding@resend.dev".to_string());

        Ok(Self::new(api_key, from))
    }
}

/// Resend email provider.
pub struct ResendProvider {
    config: ResendConfig,
    client: Client,
}

impl ResendProvider {
    pub fn new(config: ResendConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn from_env() -> NotificationResult<Self> {
        Ok(Self::new(ResendConfig::from_env()?))
    }
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ResendErrorBody {
    message: String,
    #[serde(default)]
    name: Option<String>,
}

#[async_trait]
impl EmailProvider for ResendProvider {
    async fn send(&self, email: &EmailContent) -> NotificationResult<SentEmail> {
        if email.to.trim().is_empty() || !email.to.contains('@') {
            return Err(NotificationError::InvalidEmail(email.to.clone()));
        }

        let request = SendEmailRequest {
            from: email.from.as_deref().unwrap_or(&self.config.from),
            to: vec![email.to.as_str()],
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        };

        debug!(to = %email.to, subject = %email.subject, "Sending email via Resend");

        let response = self
            .client
            .post(format!("{}/emails", self.config.api_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            let body: SendEmailResponse = response.json().await?;
            info!(to = %email.to, message_id = %body.id, "Email sent via Resend");
            return Ok(SentEmail {
                message_id: Some(body.id),
            });
        }

        let error_body = response.text().await.unwrap_or_default();
        error!(
            to = %email.to,
            status = %status,
            error = %error_body,
            "Failed to send email via Resend"
        );

        let message = match serde_json::from_str::<ResendErrorBody>(&error_body) {
            Ok(body) => match body.name {
                Some(name) => format!("{}: {}", name, body.message),
                None => body.message,
            },
            Err(_) => error_body,
        };

        // 401/403 mean the key is wrong; resending will not help.
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(NotificationError::ConfigError(format!(
                "Resend rejected the API key ({}): {}",
                status, message
            )));
        }

        Err(NotificationError::ProviderError(format!(
            "Resend error ({}): {}",
            status, message
        )))
    }

    fn name(&self) -> &'static str {
        "resend"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_to_production_api() {
        let config = ResendConfig::new("re_test".to_string(), "noreply@mu.test".to_string());
        assert_eq!(config.api_url, "https://api.resend.com");
    }

    #[test]
    fn test_request_omits_empty_text() {
        let request = SendEmailRequest {
            from: "noreply@mu.test",
            to: vec!["alice@example.com"],
            subject: "Verifica tu cuenta",
            html: "<p>hola</p>",
            text: "",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("text").is_none());
        assert_eq!(json["to"][0], "alice@example.com");
    }

    #[tokio::test]
    async fn test_send_rejects_missing_recipient() {
        let provider = ResendProvider::new(ResendConfig::new(
            "re_test".to_string(),
            "noreply@mu.test".to_string(),
        ));
        let result = provider.send(&EmailContent::default()).await;
        assert!(matches!(result, Err(NotificationError::InvalidEmail(_))));
    }
}
