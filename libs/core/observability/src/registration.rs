//! Metrics for the registration queue and verification flow.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Registration metrics recorder
pub struct RegistrationMetrics;

impl RegistrationMetrics {
    // =========================================================================
    // Queue
    // =========================================================================

    pub fn job_submitted() {
        counter!("registration_jobs_submitted_total").increment(1);
    }

    /// Record a job that stored its pending account and sent the email
    pub fn job_completed(duration: Duration) {
        counter!("registration_jobs_completed_total").increment(1);
        histogram!("registration_job_duration_seconds").record(duration.as_secs_f64());
    }

    pub fn job_retried() {
        counter!("registration_jobs_retried_total").increment(1);
    }

    /// Record a job that ended in the dead-letter list
    pub fn job_failed(reason: &str) {
        counter!("registration_jobs_failed_total", "reason" => reason.to_string()).increment(1);
    }

    pub fn set_in_flight(count: usize) {
        gauge!("registration_jobs_in_flight").set(count as f64);
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// Record a verification attempt; `outcome` is `verified` or an error kind
    pub fn verification(outcome: &str) {
        counter!("registration_verifications_total", "outcome" => outcome.to_string())
            .increment(1);
    }

    /// Record a resend request; `outcome` is `sent` or an error kind
    pub fn resend(outcome: &str) {
        counter!("registration_resends_total", "outcome" => outcome.to_string()).increment(1);
    }
}
