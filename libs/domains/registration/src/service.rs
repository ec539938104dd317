use chrono::Utc;
use observability::RegistrationMetrics;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::cooldown::ResendCooldown;
use crate::error::{RegistrationError, RegistrationResult, StoreError};
use crate::mailer::VerificationMailer;
use crate::models::{
    ClientMeta, ConfirmedAccount, PendingAccount, VerificationAction, VerificationLogEntry,
};
use crate::repository::AccountStore;
use crate::token::{IssuedToken, mask_email};

/// Result of a successful resend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResendOutcome {
    /// Masked destination, only when the caller identified by username.
    pub email_hint: Option<String>,
    /// Whether an expired token was replaced.
    pub rotated: bool,
}

/// Token consumption and verification resends.
#[derive(Clone)]
pub struct VerificationService {
    store: Arc<dyn AccountStore>,
    mailer: VerificationMailer,
    cooldown: Arc<ResendCooldown>,
}

impl VerificationService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        mailer: VerificationMailer,
        cooldown: Arc<ResendCooldown>,
    ) -> Self {
        Self {
            store,
            mailer,
            cooldown,
        }
    }

    /// Consume a verification token and create the confirmed account.
    ///
    /// Returns the confirmed username.
    #[instrument(skip_all)]
    pub async fn verify(
        &self,
        token: Option<&str>,
        client: &ClientMeta,
    ) -> RegistrationResult<String> {
        let result = self.consume_token(token, client).await;
        match &result {
            Ok(_) => RegistrationMetrics::verification("verified"),
            Err(err) => RegistrationMetrics::verification(err.kind().as_ref()),
        }
        result
    }

    async fn consume_token(
        &self,
        token: Option<&str>,
        client: &ClientMeta,
    ) -> RegistrationResult<String> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(RegistrationError::MissingToken)?;

        let pending = self
            .store
            .find_pending_by_token(token)
            .await?
            .ok_or(RegistrationError::TokenNotFound)?;

        if pending.is_expired_at(Utc::now()) {
            self.store.delete_pending(&pending.username).await?;
            info!(username = %pending.username, "Expired verification token discarded");
            self.log_event(
                VerificationLogEntry::new(&pending, VerificationAction::Expired)
                    .with_client(client)
                    .with_details(format!("expired at {}", pending.expires_at.to_rfc3339())),
            )
            .await;
            return Err(RegistrationError::TokenExpired);
        }

        if self.store.user_exists(&pending.username).await? {
            return self.discard_confirmed(&pending).await;
        }

        match self
            .store
            .insert_confirmed(&ConfirmedAccount::from_pending(&pending))
            .await
        {
            Ok(()) => {}
            // Another request consumed the same token first.
            Err(StoreError::UniqueViolation(_)) => return self.discard_confirmed(&pending).await,
            Err(err) => return Err(err.into()),
        }

        self.store.delete_pending(&pending.username).await?;

        info!(username = %pending.username, "Account verified");
        self.log_event(
            VerificationLogEntry::new(&pending, VerificationAction::Verified).with_client(client),
        )
        .await;

        Ok(pending.username)
    }

    async fn discard_confirmed(&self, pending: &PendingAccount) -> RegistrationResult<String> {
        self.store.delete_pending(&pending.username).await?;
        warn!(username = %pending.username, "Pending account already confirmed, discarded");
        Err(RegistrationError::UserAlreadyExists(
            pending.username.clone(),
        ))
    }

    /// Send the verification email again, rotating the token only if it has
    /// expired.
    ///
    /// `identifier` is treated as an email address when `is_email_hint` is
    /// `Some(true)` or when it contains `@`.
    #[instrument(skip_all)]
    pub async fn resend(
        &self,
        identifier: Option<&str>,
        is_email_hint: Option<bool>,
        client: &ClientMeta,
    ) -> RegistrationResult<ResendOutcome> {
        let result = self.resend_inner(identifier, is_email_hint, client).await;
        match &result {
            Ok(_) => RegistrationMetrics::resend("sent"),
            Err(err) => RegistrationMetrics::resend(err.kind().as_ref()),
        }
        result
    }

    async fn resend_inner(
        &self,
        identifier: Option<&str>,
        is_email_hint: Option<bool>,
        client: &ClientMeta,
    ) -> RegistrationResult<ResendOutcome> {
        let identifier = identifier
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .ok_or(RegistrationError::MissingIdentifier)?;

        let is_email = is_email_hint == Some(true) || identifier.contains('@');
        let key = ResendCooldown::key_for(identifier, is_email);

        self.cooldown
            .check(&key)
            .map_err(|remaining_secs| RegistrationError::CooldownActive { remaining_secs })?;

        let pending = if is_email {
            self.store
                .find_latest_pending_by_email(identifier)
                .await?
                .ok_or(RegistrationError::EmailNotFound)?
        } else {
            self.store
                .find_pending_by_username(identifier)
                .await?
                .ok_or(RegistrationError::UsernameNotFound)?
        };

        let (token, rotated) = if pending.is_expired_at(Utc::now()) {
            let issued = IssuedToken::generate();
            let updated = self
                .store
                .update_pending_token(&pending.username, &issued)
                .await?;
            // Verified or discarded between the lookup and the rotation.
            if !updated {
                return Err(if is_email {
                    RegistrationError::EmailNotFound
                } else {
                    RegistrationError::UsernameNotFound
                });
            }
            (issued.token, true)
        } else {
            (pending.verification_token.clone(), false)
        };

        self.mailer
            .send_verification(&pending.username, &pending.email, &token)
            .await?;
        self.cooldown.record(key);

        info!(username = %pending.username, rotated, "Verification email resent");
        self.log_event(
            VerificationLogEntry::new(&pending, VerificationAction::Resent)
                .with_client(client)
                .with_details(if rotated { "token rotated" } else { "token reused" }),
        )
        .await;

        Ok(ResendOutcome {
            email_hint: (!is_email).then(|| mask_email(&pending.email)),
            rotated,
        })
    }

    /// Audit logging must never fail the request.
    async fn log_event(&self, entry: VerificationLogEntry) {
        if let Err(err) = self.store.log_verification(&entry).await {
            warn!(
                username = %entry.username,
                action = %entry.action,
                error = %err,
                "Failed to write verification log"
            );
        }
    }
}
