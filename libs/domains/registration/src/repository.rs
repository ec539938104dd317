use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::models::{ConfirmedAccount, PendingAccount, VerificationLogEntry};
use crate::token::IssuedToken;

/// Access to the pending-account, confirmed-account and audit tables.
///
/// Implementations retry transient connection failures themselves; every
/// error that reaches the caller is final for that call.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Whether a confirmed game account owns `username`.
    async fn user_exists(&self, username: &str) -> StoreResult<bool>;

    /// Whether a pending registration holds `username`.
    async fn pending_exists(&self, username: &str) -> StoreResult<bool>;

    /// Insert a pending registration. Fails with
    /// [`StoreError::UniqueViolation`] if the username is already pending.
    async fn insert_pending(&self, account: &PendingAccount) -> StoreResult<()>;

    async fn find_pending_by_token(&self, token: &str) -> StoreResult<Option<PendingAccount>>;

    async fn find_pending_by_username(&self, username: &str)
    -> StoreResult<Option<PendingAccount>>;

    /// Most recently created pending registration for `email`, compared
    /// case-insensitively.
    async fn find_latest_pending_by_email(&self, email: &str)
    -> StoreResult<Option<PendingAccount>>;

    /// Replace the token and expiry of a pending registration. Returns
    /// `false` if no row holds `username`.
    async fn update_pending_token(&self, username: &str, token: &IssuedToken)
    -> StoreResult<bool>;

    /// Returns `false` if nothing was deleted.
    async fn delete_pending(&self, username: &str) -> StoreResult<bool>;

    /// Insert a confirmed account. Fails with
    /// [`StoreError::UniqueViolation`] if the username is taken.
    async fn insert_confirmed(&self, account: &ConfirmedAccount) -> StoreResult<()>;

    async fn log_verification(&self, entry: &VerificationLogEntry) -> StoreResult<()>;
}

#[derive(Debug, Default)]
struct Tables {
    pending: HashMap<String, PendingAccount>,
    confirmed: HashMap<String, ConfirmedAccount>,
    log: Vec<VerificationLogEntry>,
}

/// In-memory implementation of AccountStore (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryAccountStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn confirmed_account(&self, username: &str) -> Option<ConfirmedAccount> {
        self.tables.read().await.confirmed.get(username).cloned()
    }

    pub async fn pending_account(&self, username: &str) -> Option<PendingAccount> {
        self.tables.read().await.pending.get(username).cloned()
    }

    pub async fn pending_count(&self) -> usize {
        self.tables.read().await.pending.len()
    }

    pub async fn verification_log(&self) -> Vec<VerificationLogEntry> {
        self.tables.read().await.log.clone()
    }

    /// Move the expiry of a pending registration, e.g. into the past.
    pub async fn set_pending_expiry(&self, username: &str, expires_at: DateTime<Utc>) -> bool {
        match self.tables.write().await.pending.get_mut(username) {
            Some(pending) => {
                pending.expires_at = expires_at;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn user_exists(&self, username: &str) -> StoreResult<bool> {
        Ok(self.tables.read().await.confirmed.contains_key(username))
    }

    async fn pending_exists(&self, username: &str) -> StoreResult<bool> {
        Ok(self.tables.read().await.pending.contains_key(username))
    }

    async fn insert_pending(&self, account: &PendingAccount) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        if tables.pending.contains_key(&account.username) {
            return Err(StoreError::UniqueViolation(format!(
                "PendingAccounts.username = {}",
                account.username
            )));
        }

        tables
            .pending
            .insert(account.username.clone(), account.clone());
        Ok(())
    }

    async fn find_pending_by_token(&self, token: &str) -> StoreResult<Option<PendingAccount>> {
        let tables = self.tables.read().await;
        Ok(tables
            .pending
            .values()
            .find(|p| p.verification_token == token)
            .cloned())
    }

    async fn find_pending_by_username(
        &self,
        username: &str,
    ) -> StoreResult<Option<PendingAccount>> {
        Ok(self.tables.read().await.pending.get(username).cloned())
    }

    async fn find_latest_pending_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Option<PendingAccount>> {
        let tables = self.tables.read().await;
        Ok(tables
            .pending
            .values()
            .filter(|p| p.email.eq_ignore_ascii_case(email))
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn update_pending_token(
        &self,
        username: &str,
        token: &IssuedToken,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.pending.get_mut(username) {
            Some(pending) => {
                pending.verification_token = token.token.clone();
                pending.expires_at = token.expires_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_pending(&self, username: &str) -> StoreResult<bool> {
        Ok(self.tables.write().await.pending.remove(username).is_some())
    }

    async fn insert_confirmed(&self, account: &ConfirmedAccount) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        if tables.confirmed.contains_key(&account.username) {
            return Err(StoreError::UniqueViolation(format!(
                "MEMB_INFO.memb___id = {}",
                account.username
            )));
        }

        tables
            .confirmed
            .insert(account.username.clone(), account.clone());
        Ok(())
    }

    async fn log_verification(&self, entry: &VerificationLogEntry) -> StoreResult<()> {
        self.tables.write().await.log.push(entry.clone());
        Ok(())
    }
}
