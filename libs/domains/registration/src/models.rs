use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use strum::{AsRefStr, Display};
use utoipa::ToSchema;
use validator::Validate;

use crate::token::IssuedToken;

/// Game account columns only accept ASCII letters and digits.
static ACCOUNT_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+$").unwrap());

fn validate_account_name(name: &str) -> Result<(), validator::ValidationError> {
    if !ACCOUNT_ALPHANUMERIC.is_match(name) {
        return Err(validator::ValidationError::new("invalid_account_name")
            .with_message("El usuario solo puede contener letras y números".into()));
    }
    Ok(())
}

// =============================================================================
// HTTP DTOs
// =============================================================================

/// Registration form submitted by a player.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(
        length(min = 4, max = 10, message = "El usuario debe tener entre 4 y 10 caracteres"),
        custom(function = "validate_account_name")
    )]
    #[schema(example = "alice")]
    pub username: String,

    #[validate(length(min = 4, max = 10, message = "La contraseña debe tener entre 4 y 10 caracteres"))]
    pub password: String,

    #[validate(email(message = "Correo electrónico inválido"))]
    #[schema(example = "alice@example.com")]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub job_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct VerifyEmailRequest {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyEmailResponse {
    pub success: bool,
    pub message: String,
    pub username: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResendVerificationRequest {
    /// Username or email address of the pending registration.
    #[serde(default)]
    pub identifier: Option<String>,
    /// Force the identifier to be treated as an email address.
    #[serde(default)]
    pub is_email: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResendVerificationResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_hint: Option<String>,
}

/// Body of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

// =============================================================================
// Queue
// =============================================================================

/// Data needed to register an account, plus request metadata for auditing.
#[derive(Debug, Clone)]
pub struct RegistrationSubmission {
    pub username: String,
    pub password: String,
    pub email: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RegistrationSubmission {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: email.into(),
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

/// A queued registration. Lives only in memory.
#[derive(Debug, Clone)]
pub struct RegistrationJob {
    pub id: String,
    pub username: String,
    pub password: String,
    pub email: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub retries: u32,
    pub max_retries: u32,
    /// Set once the pending row is stored; later attempts only resend the email.
    pub issued_token: Option<IssuedToken>,
}

impl RegistrationJob {
    pub fn new(id: String, submission: RegistrationSubmission, max_retries: u32) -> Self {
        Self {
            id,
            username: submission.username,
            password: submission.password,
            email: submission.email,
            ip_address: submission.ip_address,
            user_agent: submission.user_agent,
            timestamp: Utc::now(),
            retries: 0,
            max_retries,
            issued_token: None,
        }
    }

    pub fn can_retry(&self) -> bool {
        self.retries < self.max_retries
    }
}

/// Point-in-time view of the queue counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub total_processed: u64,
    /// Jobs waiting for a free slot, including scheduled retries.
    pub queue_length: usize,
    /// Jobs currently being processed.
    pub processing_jobs: usize,
    pub dead_letters: usize,
}

/// A job the queue gave up on.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FailedJob {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Error kind, e.g. `USER_EXISTS`.
    pub reason: String,
    pub attempts: u32,
    pub failed_at: DateTime<Utc>,
}

// =============================================================================
// Stored records
// =============================================================================

/// Unconfirmed registration waiting for its token to be consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAccount {
    pub username: String,
    pub password: String,
    pub email: String,
    pub verification_token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl PendingAccount {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Row written to the game's account table on successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedAccount {
    pub username: String,
    pub password: String,
    pub email: String,
    pub memb_name: String,
    pub bloc_code: String,
    pub ctl1_code: String,
    pub sno_numb: String,
}

impl ConfirmedAccount {
    /// Game defaults: unblocked, normal account, placeholder personal ID.
    pub fn from_pending(pending: &PendingAccount) -> Self {
        Self {
            username: pending.username.clone(),
            password: pending.password.clone(),
            email: pending.email.clone(),
            memb_name: pending.username.clone(),
            bloc_code: "0".to_string(),
            ctl1_code: "0".to_string(),
            sno_numb: "1111111111111".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum VerificationAction {
    Verified,
    Expired,
    Resent,
}

/// Audit row for `EmailVerificationLog`.
#[derive(Debug, Clone)]
pub struct VerificationLogEntry {
    pub email: String,
    pub username: String,
    pub action: VerificationAction,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl VerificationLogEntry {
    pub fn new(pending: &PendingAccount, action: VerificationAction) -> Self {
        Self {
            email: pending.email.clone(),
            username: pending.username.clone(),
            action,
            ip_address: None,
            user_agent: None,
            details: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_client(mut self, client: &ClientMeta) -> Self {
        self.ip_address = client.ip_address.clone();
        self.user_agent = client.user_agent.clone();
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Caller metadata recorded alongside verification events.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
