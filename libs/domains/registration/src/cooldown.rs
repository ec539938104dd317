//! Per-identifier rate limit for verification resends.
//!
//! Advisory only: entries live in process memory and are lost on restart.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_RESEND_COOLDOWN: Duration = Duration::from_secs(60);
pub const DEFAULT_PRUNE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct CooldownConfig {
    /// Minimum time between two resends for the same identifier.
    pub window: Duration,
    /// How often stale entries are swept.
    pub prune_interval: Duration,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_RESEND_COOLDOWN,
            prune_interval: DEFAULT_PRUNE_INTERVAL,
        }
    }
}

#[derive(Debug)]
struct CooldownState {
    last_resend: HashMap<String, Instant>,
    last_prune: Instant,
}

#[derive(Debug)]
pub struct ResendCooldown {
    config: CooldownConfig,
    state: Mutex<CooldownState>,
}

impl Default for ResendCooldown {
    fn default() -> Self {
        Self::new(CooldownConfig::default())
    }
}

impl ResendCooldown {
    pub fn new(config: CooldownConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CooldownState {
                last_resend: HashMap::new(),
                last_prune: Instant::now(),
            }),
        }
    }

    /// Emails are case-insensitive; usernames are not.
    pub fn key_for(identifier: &str, is_email: bool) -> String {
        if is_email {
            identifier.to_lowercase()
        } else {
            identifier.to_string()
        }
    }

    /// `Err(remaining_secs)` while `key` is cooling down. Never reports zero.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.prune_if_due(&mut state, now);

        match state.last_resend.get(key) {
            Some(last) => {
                let elapsed = now.saturating_duration_since(*last);
                if elapsed < self.config.window {
                    let remaining = self.config.window - elapsed;
                    Err(remaining_secs(remaining))
                } else {
                    Ok(())
                }
            }
            None => Ok(()),
        }
    }

    /// Start the cooldown window for `key` now.
    pub fn record(&self, key: impl Into<String>) {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.prune_if_due(&mut state, now);
        state.last_resend.insert(key.into(), now);
    }

    /// Number of tracked identifiers, including expired ones not yet pruned.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_resend
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune_if_due(&self, state: &mut CooldownState, now: Instant) {
        if now.saturating_duration_since(state.last_prune) < self.config.prune_interval {
            return;
        }

        let window = self.config.window;
        let before = state.last_resend.len();
        state
            .last_resend
            .retain(|_, last| now.saturating_duration_since(*last) < window);
        state.last_prune = now;

        let pruned = before - state.last_resend.len();
        if pruned > 0 {
            tracing::debug!(pruned, remaining = state.last_resend.len(), "Pruned resend cooldowns");
        }
    }
}

fn remaining_secs(remaining: Duration) -> u64 {
    let millis = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);
    millis.div_ceil(1000).max(1)
}
