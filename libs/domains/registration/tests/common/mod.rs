//! Shared fixtures for the registration integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use domain_notifications::{
    EmailContent, EmailProvider, NotificationError, NotificationResult, SentEmail, TemplateEngine,
};
use domain_registration::{
    CooldownConfig, InMemoryAccountStore, MailerConfig, QueueConfig, RegistrationQueue,
    RegistrationState, ResendCooldown, VerificationMailer, VerificationService,
};
use mockall::mock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE_URL: &str = "https://mu.test";

mock! {
    pub Provider {}

    #[async_trait]
    impl EmailProvider for Provider {
        async fn send(&self, email: &EmailContent) -> NotificationResult<SentEmail>;
        fn name(&self) -> &'static str;
    }
}

/// Provider that records every accepted email.
///
/// Can be told to fail its first `n` sends and to hold each send for a
/// while, and tracks how many sends overlapped.
#[derive(Default)]
pub struct Outbox {
    sent: Mutex<Vec<EmailContent>>,
    attempts: AtomicUsize,
    fail_first: usize,
    delay: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_first(n: usize) -> Self {
        Self {
            fail_first: n,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Hold each send for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn sent(&self) -> Vec<EmailContent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Token embedded in the most recent email sent to `to`.
    pub fn last_token_for(&self, to: &str) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find(|email| email.to == to)
            .and_then(|email| extract_token(&email.text))
    }
}

#[async_trait]
impl EmailProvider for Outbox {
    async fn send(&self, email: &EmailContent) -> NotificationResult<SentEmail> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if attempt < self.fail_first {
            return Err(NotificationError::ProviderError("502 Bad Gateway".to_string()));
        }

        self.sent.lock().unwrap().push(email.clone());
        Ok(SentEmail {
            message_id: Some(format!("msg-{attempt}")),
        })
    }

    fn name(&self) -> &'static str {
        "outbox"
    }
}

pub fn extract_token(body: &str) -> Option<String> {
    let start = body.find("token=")? + "token=".len();
    let token: String = body[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    (!token.is_empty()).then_some(token)
}

pub fn mailer(provider: Arc<dyn EmailProvider>) -> VerificationMailer {
    VerificationMailer::new(
        provider,
        TemplateEngine::new().unwrap(),
        MailerConfig {
            base_url: BASE_URL.to_string(),
            server_name: "MuOnline".to_string(),
        },
    )
    .unwrap()
}

pub fn fast_queue_config() -> QueueConfig {
    QueueConfig {
        max_concurrent: 50,
        max_retries: 3,
        retry_base_delay: Duration::from_millis(5),
    }
}

pub fn queue(
    store: &InMemoryAccountStore,
    provider: Arc<dyn EmailProvider>,
    config: QueueConfig,
) -> RegistrationQueue {
    RegistrationQueue::new(Arc::new(store.clone()), mailer(provider), config)
}

pub fn verification(
    store: &InMemoryAccountStore,
    provider: Arc<dyn EmailProvider>,
    cooldown: CooldownConfig,
) -> VerificationService {
    VerificationService::new(
        Arc::new(store.clone()),
        mailer(provider),
        Arc::new(ResendCooldown::new(cooldown)),
    )
}

pub fn state(store: &InMemoryAccountStore, provider: Arc<dyn EmailProvider>) -> RegistrationState {
    RegistrationState {
        queue: queue(store, provider.clone(), fast_queue_config()),
        verification: verification(store, provider, CooldownConfig::default()),
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached within 2s"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
