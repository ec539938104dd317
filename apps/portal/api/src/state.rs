//! Application state management.
//!
//! Holds the configuration, the database pool for readiness checks, and the
//! registration services shared by every handler.

use domain_registration::RegistrationState;

/// Shared application state.
///
/// Cloning is cheap: the queue and verification service are `Arc`-backed and
/// the connection pool is shared.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded from environment variables
    pub config: crate::config::Config,
    /// PostgreSQL connection pool
    pub db: database::postgres::DatabaseConnection,
    /// Registration queue and verification service
    pub registration: RegistrationState,
}
