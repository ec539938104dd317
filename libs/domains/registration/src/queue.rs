//! In-process registration job queue.
//!
//! `submit` returns immediately; each job then runs as its own tokio task,
//! with at most `max_concurrent` tasks in flight. Transient failures are
//! retried with exponential backoff and retries jump the line. Jobs are never
//! persisted: a restart loses everything that was queued.
//!
//! The queue state sits behind a synchronous mutex that is only held for
//! field updates, never across an `.await`.

use chrono::Utc;
use observability::RegistrationMetrics;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{RegistrationError, RegistrationResult, StoreError};
use crate::mailer::VerificationMailer;
use crate::models::{FailedJob, PendingAccount, QueueStats, RegistrationJob, RegistrationSubmission};
use crate::repository::AccountStore;
use crate::token::IssuedToken;

/// Most recent permanently failed jobs kept for inspection.
pub const DEAD_LETTER_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Upper bound on jobs being processed at the same time.
    pub max_concurrent: usize,
    /// Attempts after the first one before a job is dropped.
    pub max_retries: u32,
    /// Retry `n` waits `retry_base_delay * 2^n`.
    pub retry_base_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 50,
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

impl QueueConfig {
    pub fn retry_delay(&self, retries: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(retries))
    }
}

#[derive(Debug, Default)]
struct Counters {
    pending: u64,
    processing: u64,
    completed: u64,
    failed: u64,
    total_processed: u64,
}

#[derive(Debug, Default)]
struct QueueState {
    waiting: VecDeque<RegistrationJob>,
    in_flight: HashSet<String>,
    counters: Counters,
    dead_letters: VecDeque<FailedJob>,
}

struct Inner {
    store: Arc<dyn AccountStore>,
    mailer: VerificationMailer,
    config: QueueConfig,
    state: Mutex<QueueState>,
}

/// Handle to the registration queue. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RegistrationQueue {
    inner: Arc<Inner>,
}

impl RegistrationQueue {
    pub fn new(
        store: Arc<dyn AccountStore>,
        mailer: VerificationMailer,
        config: QueueConfig,
    ) -> Self {
        info!(
            max_concurrent = config.max_concurrent,
            max_retries = config.max_retries,
            "Registration queue ready"
        );

        Self {
            inner: Arc::new(Inner {
                store,
                mailer,
                config,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Enqueue a registration and return its job id.
    ///
    /// The payload is not validated here. Must be called from within a tokio
    /// runtime.
    pub fn submit(&self, submission: RegistrationSubmission) -> String {
        let id = Uuid::new_v4().to_string();
        let job = RegistrationJob::new(id.clone(), submission, self.inner.config.max_retries);

        info!(job_id = %id, username = %job.username, "Registration job submitted");
        RegistrationMetrics::job_submitted();

        {
            let mut state = self.state();
            state.waiting.push_back(job);
            state.counters.pending += 1;
        }

        self.process_queue();
        id
    }

    /// Best-effort snapshot of the counters.
    pub fn get_stats(&self) -> QueueStats {
        let state = self.state();
        QueueStats {
            pending: state.counters.pending,
            processing: state.counters.processing,
            completed: state.counters.completed,
            failed: state.counters.failed,
            total_processed: state.counters.total_processed,
            queue_length: state.waiting.len(),
            processing_jobs: state.in_flight.len(),
            dead_letters: state.dead_letters.len(),
        }
    }

    /// Permanently failed jobs, oldest first.
    pub fn dead_letters(&self) -> Vec<FailedJob> {
        self.state().dead_letters.iter().cloned().collect()
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Start waiting jobs until the concurrency cap is reached.
    fn process_queue(&self) {
        let (started, in_flight) = {
            let mut state = self.state();
            let mut started = Vec::new();

            while state.in_flight.len() < self.inner.config.max_concurrent {
                let Some(job) = state.waiting.pop_front() else {
                    break;
                };
                state.in_flight.insert(job.id.clone());
                state.counters.pending = state.counters.pending.saturating_sub(1);
                state.counters.processing += 1;
                started.push(job);
            }

            (started, state.in_flight.len())
        };

        RegistrationMetrics::set_in_flight(in_flight);
        for job in started {
            let queue = self.clone();
            tokio::spawn(async move { queue.run_job(job).await });
        }
    }

    async fn run_job(self, mut job: RegistrationJob) {
        let started = Instant::now();
        let result = self.process_job(&mut job).await;

        match result {
            Ok(()) => {
                {
                    let mut state = self.state();
                    state.in_flight.remove(&job.id);
                    state.counters.processing = state.counters.processing.saturating_sub(1);
                    state.counters.completed += 1;
                    state.counters.total_processed += 1;
                }

                info!(
                    job_id = %job.id,
                    username = %job.username,
                    attempts = job.retries + 1,
                    "Registration job completed"
                );
                RegistrationMetrics::job_completed(started.elapsed());
                self.process_queue();
            }
            Err(err) if !err.is_permanent() && job.can_retry() => {
                job.retries += 1;
                let delay = self.inner.config.retry_delay(job.retries);

                {
                    let mut state = self.state();
                    state.in_flight.remove(&job.id);
                    state.counters.processing = state.counters.processing.saturating_sub(1);
                    state.counters.pending += 1;
                }

                warn!(
                    job_id = %job.id,
                    username = %job.username,
                    retry = job.retries,
                    max_retries = job.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Registration job failed, retrying"
                );
                RegistrationMetrics::job_retried();

                // The slot is free while this job waits out its backoff.
                self.process_queue();
                tokio::time::sleep(delay).await;

                self.state().waiting.push_front(job);
                self.process_queue();
            }
            Err(err) => {
                let failed = FailedJob {
                    id: job.id.clone(),
                    username: job.username.clone(),
                    email: job.email.clone(),
                    reason: err.kind().to_string(),
                    attempts: job.retries + 1,
                    failed_at: Utc::now(),
                };

                {
                    let mut state = self.state();
                    state.in_flight.remove(&job.id);
                    state.counters.processing = state.counters.processing.saturating_sub(1);
                    state.counters.failed += 1;
                    state.counters.total_processed += 1;
                    if state.dead_letters.len() == DEAD_LETTER_CAPACITY {
                        state.dead_letters.pop_front();
                    }
                    state.dead_letters.push_back(failed);
                }

                if err.is_permanent() {
                    warn!(
                        job_id = %job.id,
                        username = %job.username,
                        kind = %err.kind(),
                        "Registration job rejected"
                    );
                } else {
                    error!(
                        job_id = %job.id,
                        username = %job.username,
                        attempts = job.retries + 1,
                        error = %err,
                        "Registration job failed after all retries"
                    );
                }
                RegistrationMetrics::job_failed(err.kind().as_ref());
                self.process_queue();
            }
        }
    }

    /// One attempt. A job that already stored its pending row only resends
    /// the email.
    async fn process_job(&self, job: &mut RegistrationJob) -> RegistrationResult<()> {
        let token = match job.issued_token.as_ref().map(|t| t.token.clone()) {
            Some(token) => token,
            None => {
                let issued = self.store_pending(job).await?;
                let token = issued.token.clone();
                job.issued_token = Some(issued);
                token
            }
        };

        self.inner
            .mailer
            .send_verification(&job.username, &job.email, &token)
            .await
    }

    async fn store_pending(&self, job: &RegistrationJob) -> RegistrationResult<IssuedToken> {
        let store = &self.inner.store;

        if store.user_exists(&job.username).await? {
            return Err(RegistrationError::UserExists(job.username.clone()));
        }
        if store.pending_exists(&job.username).await? {
            return Err(RegistrationError::PendingExists(job.username.clone()));
        }

        let now = Utc::now();
        let issued = IssuedToken::generate_at(now);
        let pending = PendingAccount {
            username: job.username.clone(),
            password: job.password.clone(),
            email: job.email.clone(),
            verification_token: issued.token.clone(),
            expires_at: issued.expires_at,
            created_at: now,
            ip_address: job.ip_address.clone(),
            user_agent: job.user_agent.clone(),
        };

        store.insert_pending(&pending).await.map_err(|err| match err {
            // Lost the race against a concurrent registration for the same name.
            StoreError::UniqueViolation(_) => RegistrationError::PendingExists(job.username.clone()),
            other => RegistrationError::Store(other),
        })?;

        info!(job_id = %job.id, username = %job.username, "Pending account stored");
        Ok(issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles() {
        let config = QueueConfig::default();
        assert_eq!(config.retry_delay(1), Duration::from_secs(2));
        assert_eq!(config.retry_delay(2), Duration::from_secs(4));
        assert_eq!(config.retry_delay(3), Duration::from_secs(8));
    }

    #[test]
    fn test_retry_delay_saturates() {
        let config = QueueConfig::default();
        assert!(config.retry_delay(64) >= Duration::from_secs(u64::from(u32::MAX)));
    }

    #[test]
    fn test_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.max_concurrent, 50);
        assert_eq!(config.max_retries, 3);
    }
}
