//! Error types for the notifications domain.

use thiserror::Error;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur while rendering or delivering email.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The provider rejected the request or could not be reached.
    #[error("Email provider error: {0}")]
    ProviderError(String),

    /// Template rendering error.
    #[error("Template rendering error: {0}")]
    TemplateError(String),

    /// Missing API key or sender address.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Recipient address is empty or malformed.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotificationError {
    /// Configuration problems will not go away by sending again.
    pub fn is_config(&self) -> bool {
        matches!(self, NotificationError::ConfigError(_))
    }
}

impl From<handlebars::RenderError> for NotificationError {
    fn from(err: handlebars::RenderError) -> Self {
        NotificationError::TemplateError(err.to_string())
    }
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        NotificationError::ProviderError(err.to_string())
    }
}

impl From<serde_json::Error> for NotificationError {
    fn from(err: serde_json::Error) -> Self {
        NotificationError::Internal(format!("JSON serialization error: {}", err))
    }
}
