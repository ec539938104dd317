//! Token consumption and resend-with-cooldown, exercised through
//! `VerificationService` against the in-memory store.

mod common;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use common::{MockProvider, Outbox, mailer, verification};
use domain_notifications::NotificationError;
use domain_registration::{
    AccountStore, ClientMeta, ConfirmedAccount, CooldownConfig, InMemoryAccountStore,
    IssuedToken, PendingAccount, RegistrationError, ResendCooldown, StoreError, StoreResult,
    VerificationAction, VerificationLogEntry, VerificationService,
};
use std::sync::Arc;
use std::time::Duration;

fn client() -> ClientMeta {
    ClientMeta {
        ip_address: Some("198.51.100.4".to_string()),
        user_agent: Some("test-agent".to_string()),
    }
}

async fn seed_pending(store: &InMemoryAccountStore, username: &str, email: &str) -> String {
    let now = Utc::now();
    let issued = IssuedToken::generate_at(now);
    store
        .insert_pending(&PendingAccount {
            username: username.to_string(),
            password: "secret".to_string(),
            email: email.to_string(),
            verification_token: issued.token.clone(),
            expires_at: issued.expires_at,
            created_at: now,
            ip_address: None,
            user_agent: None,
        })
        .await
        .unwrap();
    issued.token
}

fn short_cooldown() -> CooldownConfig {
    CooldownConfig {
        window: Duration::from_millis(200),
        prune_interval: Duration::from_millis(50),
    }
}

// =============================================================================
// verify
// =============================================================================

#[tokio::test]
async fn test_token_confirms_account_exactly_once() {
    let store = InMemoryAccountStore::new();
    let service = verification(&store, Arc::new(Outbox::new()), CooldownConfig::default());
    let token = seed_pending(&store, "alice", "alice@example.com").await;

    let username = service.verify(Some(&token), &client()).await.unwrap();
    assert_eq!(username, "alice");

    let confirmed = store.confirmed_account("alice").await.unwrap();
    assert_eq!(confirmed.email, "alice@example.com");
    assert_eq!(confirmed.memb_name, "alice");
    assert!(store.pending_account("alice").await.is_none());

    let again = service.verify(Some(&token), &client()).await;
    assert!(matches!(again, Err(RegistrationError::TokenNotFound)));

    let log = store.verification_log().await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, VerificationAction::Verified);
    assert_eq!(log[0].ip_address.as_deref(), Some("198.51.100.4"));
}

#[tokio::test]
async fn test_expired_token_is_reported_then_gone() {
    let store = InMemoryAccountStore::new();
    let service = verification(&store, Arc::new(Outbox::new()), CooldownConfig::default());
    let token = seed_pending(&store, "alice", "alice@example.com").await;
    store
        .set_pending_expiry("alice", Utc::now() - ChronoDuration::seconds(1))
        .await;

    let first = service.verify(Some(&token), &client()).await;
    assert!(matches!(first, Err(RegistrationError::TokenExpired)));
    assert!(store.pending_account("alice").await.is_none());
    assert!(store.confirmed_account("alice").await.is_none());

    let second = service.verify(Some(&token), &client()).await;
    assert!(matches!(second, Err(RegistrationError::TokenNotFound)));

    let log = store.verification_log().await;
    assert_eq!(log[0].action, VerificationAction::Expired);
}

#[tokio::test]
async fn test_verify_discards_pending_when_account_already_exists() {
    let store = InMemoryAccountStore::new();
    let service = verification(&store, Arc::new(Outbox::new()), CooldownConfig::default());
    let token = seed_pending(&store, "alice", "alice@example.com").await;
    let pending = store.pending_account("alice").await.unwrap();
    store
        .insert_confirmed(&ConfirmedAccount::from_pending(&pending))
        .await
        .unwrap();

    let result = service.verify(Some(&token), &client()).await;
    assert!(matches!(result, Err(RegistrationError::UserAlreadyExists(name)) if name == "alice"));
    assert!(store.pending_account("alice").await.is_none());
}

#[tokio::test]
async fn test_verify_requires_token() {
    let store = InMemoryAccountStore::new();
    let service = verification(&store, Arc::new(Outbox::new()), CooldownConfig::default());

    for token in [None, Some(""), Some("   ")] {
        let result = service.verify(token, &client()).await;
        assert!(matches!(result, Err(RegistrationError::MissingToken)));
    }
}

// =============================================================================
// resend
// =============================================================================

#[tokio::test]
async fn test_resend_within_cooldown_is_rejected() {
    let store = InMemoryAccountStore::new();
    let outbox = Arc::new(Outbox::new());
    let service = verification(&store, outbox.clone(), short_cooldown());
    seed_pending(&store, "alice", "alice@example.com").await;

    service.resend(Some("alice"), None, &client()).await.unwrap();

    match service.resend(Some("alice"), None, &client()).await {
        Err(RegistrationError::CooldownActive { remaining_secs }) => assert!(remaining_secs >= 1),
        other => panic!("expected cooldown, got {other:?}"),
    }
    assert_eq!(outbox.sent().len(), 1);

    tokio::time::sleep(Duration::from_millis(250)).await;
    service.resend(Some("alice"), None, &client()).await.unwrap();
    assert_eq!(outbox.sent().len(), 2);
}

#[tokio::test]
async fn test_email_cooldown_key_ignores_case() {
    let store = InMemoryAccountStore::new();
    let service = verification(&store, Arc::new(Outbox::new()), CooldownConfig::default());
    seed_pending(&store, "alice", "alice@example.com").await;

    service
        .resend(Some("alice@example.com"), None, &client())
        .await
        .unwrap();
    let second = service
        .resend(Some("ALICE@Example.com"), None, &client())
        .await;
    assert!(matches!(second, Err(RegistrationError::CooldownActive { .. })));
}

#[tokio::test]
async fn test_resend_reuses_valid_token() {
    let store = InMemoryAccountStore::new();
    let outbox = Arc::new(Outbox::new());
    let service = verification(&store, outbox.clone(), short_cooldown());
    let token = seed_pending(&store, "alice", "alice@example.com").await;
    let expires_at = store.pending_account("alice").await.unwrap().expires_at;

    let first = service.resend(Some("alice"), None, &client()).await.unwrap();
    let second = service
        .resend(Some("alice@example.com"), None, &client())
        .await
        .unwrap();
    assert!(!first.rotated);
    assert!(!second.rotated);

    let pending = store.pending_account("alice").await.unwrap();
    assert_eq!(pending.verification_token, token);
    assert_eq!(pending.expires_at, expires_at);
    assert!(
        outbox
            .sent()
            .iter()
            .all(|email| common::extract_token(&email.text).as_deref() == Some(token.as_str()))
    );
}

#[tokio::test]
async fn test_resend_rotates_expired_token() {
    let store = InMemoryAccountStore::new();
    let outbox = Arc::new(Outbox::new());
    let service = verification(&store, outbox.clone(), CooldownConfig::default());
    let old_token = seed_pending(&store, "alice", "alice@example.com").await;
    store
        .set_pending_expiry("alice", Utc::now() - ChronoDuration::minutes(5))
        .await;

    let outcome = service.resend(Some("alice"), None, &client()).await.unwrap();
    assert!(outcome.rotated);

    let pending = store.pending_account("alice").await.unwrap();
    assert_ne!(pending.verification_token, old_token);
    assert!(pending.expires_at > Utc::now() + ChronoDuration::hours(23));

    let new_token = outbox.last_token_for("alice@example.com").unwrap();
    assert_eq!(new_token, pending.verification_token);

    assert!(matches!(
        service.verify(Some(&old_token), &client()).await,
        Err(RegistrationError::TokenNotFound)
    ));
    assert_eq!(
        service.verify(Some(&new_token), &client()).await.unwrap(),
        "alice"
    );
}

#[tokio::test]
async fn test_resend_by_username_returns_masked_hint() {
    let store = InMemoryAccountStore::new();
    let service = verification(&store, Arc::new(Outbox::new()), CooldownConfig::default());
    seed_pending(&store, "alice", "alice@example.com").await;
    seed_pending(&store, "bob", "bob@example.com").await;

    let by_username = service.resend(Some("alice"), None, &client()).await.unwrap();
    assert_eq!(by_username.email_hint.as_deref(), Some("a***e@e*****e.com"));

    let by_email = service
        .resend(Some("bob@example.com"), None, &client())
        .await
        .unwrap();
    assert_eq!(by_email.email_hint, None);
}

#[tokio::test]
async fn test_resend_by_email_picks_most_recent_pending() {
    let store = InMemoryAccountStore::new();
    let outbox = Arc::new(Outbox::new());
    let service = verification(&store, outbox.clone(), CooldownConfig::default());
    seed_pending(&store, "older", "shared@example.com").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let newest = seed_pending(&store, "newer", "shared@example.com").await;

    service
        .resend(Some("shared@example.com"), None, &client())
        .await
        .unwrap();
    assert_eq!(outbox.last_token_for("shared@example.com"), Some(newest));
}

#[tokio::test]
async fn test_resend_not_found_does_not_start_cooldown() {
    let store = InMemoryAccountStore::new();
    let service = verification(&store, Arc::new(Outbox::new()), CooldownConfig::default());

    for _ in 0..2 {
        assert!(matches!(
            service.resend(Some("ghost"), None, &client()).await,
            Err(RegistrationError::UsernameNotFound)
        ));
        assert!(matches!(
            service.resend(Some("ghost@example.com"), None, &client()).await,
            Err(RegistrationError::EmailNotFound)
        ));
    }
}

#[tokio::test]
async fn test_email_hint_forces_email_lookup() {
    let store = InMemoryAccountStore::new();
    let service = verification(&store, Arc::new(Outbox::new()), CooldownConfig::default());
    seed_pending(&store, "alice", "alice@example.com").await;

    let result = service.resend(Some("alice"), Some(true), &client()).await;
    assert!(matches!(result, Err(RegistrationError::EmailNotFound)));
}

#[tokio::test]
async fn test_resend_requires_identifier() {
    let store = InMemoryAccountStore::new();
    let service = verification(&store, Arc::new(Outbox::new()), CooldownConfig::default());

    for identifier in [None, Some(""), Some("  ")] {
        assert!(matches!(
            service.resend(identifier, None, &client()).await,
            Err(RegistrationError::MissingIdentifier)
        ));
    }
}

#[tokio::test]
async fn test_failed_send_does_not_start_cooldown() {
    let store = InMemoryAccountStore::new();
    seed_pending(&store, "alice", "alice@example.com").await;

    let mut provider = MockProvider::new();
    let mut calls = 0;
    provider.expect_send().times(2).returning(move |_| {
        calls += 1;
        if calls == 1 {
            Err(NotificationError::ProviderError("timeout".to_string()))
        } else {
            Ok(Default::default())
        }
    });
    provider.expect_name().return_const("mock");
    let service = verification(&store, Arc::new(provider), CooldownConfig::default());

    let first = service.resend(Some("alice"), None, &client()).await;
    assert!(matches!(first, Err(RegistrationError::Email(_))));

    service.resend(Some("alice"), None, &client()).await.unwrap();
}

// =============================================================================
// store faults
// =============================================================================

/// In-memory store with injectable faults.
#[derive(Clone, Default)]
struct FaultyStore {
    inner: InMemoryAccountStore,
    /// Audit table unavailable.
    broken_log: bool,
    /// The pending row disappears right before its token is rotated.
    vanish_before_rotation: bool,
}

#[async_trait]
impl AccountStore for FaultyStore {
    async fn user_exists(&self, username: &str) -> StoreResult<bool> {
        self.inner.user_exists(username).await
    }

    async fn pending_exists(&self, username: &str) -> StoreResult<bool> {
        self.inner.pending_exists(username).await
    }

    async fn insert_pending(&self, account: &PendingAccount) -> StoreResult<()> {
        self.inner.insert_pending(account).await
    }

    async fn find_pending_by_token(&self, token: &str) -> StoreResult<Option<PendingAccount>> {
        self.inner.find_pending_by_token(token).await
    }

    async fn find_pending_by_username(
        &self,
        username: &str,
    ) -> StoreResult<Option<PendingAccount>> {
        self.inner.find_pending_by_username(username).await
    }

    async fn find_latest_pending_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Option<PendingAccount>> {
        self.inner.find_latest_pending_by_email(email).await
    }

    async fn update_pending_token(
        &self,
        username: &str,
        token: &IssuedToken,
    ) -> StoreResult<bool> {
        if self.vanish_before_rotation {
            self.inner.delete_pending(username).await?;
        }
        self.inner.update_pending_token(username, token).await
    }

    async fn delete_pending(&self, username: &str) -> StoreResult<bool> {
        self.inner.delete_pending(username).await
    }

    async fn insert_confirmed(&self, account: &ConfirmedAccount) -> StoreResult<()> {
        self.inner.insert_confirmed(account).await
    }

    async fn log_verification(&self, entry: &VerificationLogEntry) -> StoreResult<()> {
        if self.broken_log {
            return Err(StoreError::Unavailable(
                "relation \"EmailVerificationLog\" does not exist".to_string(),
            ));
        }
        self.inner.log_verification(entry).await
    }
}

#[tokio::test]
async fn test_audit_log_failure_does_not_fail_verification() {
    let inner = InMemoryAccountStore::new();
    let token = seed_pending(&inner, "alice", "alice@example.com").await;

    let service = VerificationService::new(
        Arc::new(FaultyStore {
            inner: inner.clone(),
            broken_log: true,
            ..Default::default()
        }),
        mailer(Arc::new(Outbox::new())),
        Arc::new(ResendCooldown::default()),
    );

    service.resend(Some("alice"), None, &client()).await.unwrap();
    assert_eq!(service.verify(Some(&token), &client()).await.unwrap(), "alice");
    assert!(inner.confirmed_account("alice").await.is_some());
}

#[tokio::test]
async fn test_resend_fails_when_row_vanishes_before_rotation() {
    let inner = InMemoryAccountStore::new();
    seed_pending(&inner, "alice", "alice@example.com").await;
    inner
        .set_pending_expiry("alice", Utc::now() - ChronoDuration::minutes(5))
        .await;

    let outbox = Arc::new(Outbox::new());
    let service = VerificationService::new(
        Arc::new(FaultyStore {
            inner: inner.clone(),
            vanish_before_rotation: true,
            ..Default::default()
        }),
        mailer(outbox.clone()),
        Arc::new(ResendCooldown::default()),
    );

    assert!(matches!(
        service.resend(Some("alice"), None, &client()).await,
        Err(RegistrationError::UsernameNotFound)
    ));
    assert!(outbox.sent().is_empty());
    assert_eq!(inner.pending_count().await, 0);
}
