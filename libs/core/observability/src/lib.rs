//! Observability utilities for the account portal.
//!
//! This crate provides:
//! - Prometheus metrics recording and export
//! - Metrics for the registration queue and email verification
//! - Axum middleware for automatic request metrics
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, metrics_handler, RegistrationMetrics};
//!
//! // Initialize metrics recorder
//! init_metrics()?;
//!
//! RegistrationMetrics::job_submitted();
//!
//! // Add metrics endpoint to router
//! let app = Router::new()
//!     .route("/metrics", get(metrics_handler));
//! ```

pub mod middleware;
pub mod registration;

pub use middleware::metrics_middleware;
pub use registration::RegistrationMetrics;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize the Prometheus metrics recorder.
///
/// This should be called once at application startup. Later calls return
/// the handle installed by the first one.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;

        info!("Prometheus metrics recorder initialized");

        register_metric_descriptions();

        Ok(handle)
    })
}

/// Get the metrics handle (must call init_metrics first)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Axum handler for /metrics endpoint
pub async fn metrics_handler() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

/// Register metric descriptions for documentation
fn register_metric_descriptions() {
    use metrics::describe_counter;
    use metrics::describe_gauge;
    use metrics::describe_histogram;

    // HTTP metrics
    describe_counter!("http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_requests_errors_total",
        "Total number of HTTP request errors"
    );

    // Registration queue
    describe_counter!(
        "registration_jobs_submitted_total",
        "Registration jobs accepted into the queue"
    );
    describe_counter!(
        "registration_jobs_completed_total",
        "Registration jobs that stored a pending account and sent the email"
    );
    describe_counter!(
        "registration_jobs_failed_total",
        "Registration jobs dropped into the dead-letter list, by reason"
    );
    describe_counter!(
        "registration_jobs_retried_total",
        "Registration job attempts scheduled for retry"
    );
    describe_histogram!(
        "registration_job_duration_seconds",
        "Duration of successful registration jobs"
    );
    describe_gauge!(
        "registration_jobs_in_flight",
        "Registration jobs currently being processed"
    );

    // Verification
    describe_counter!(
        "registration_verifications_total",
        "Email verification attempts by outcome"
    );
    describe_counter!(
        "registration_resends_total",
        "Verification resend requests by outcome"
    );
}
