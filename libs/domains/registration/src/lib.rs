//! Registration Domain
//!
//! Pending-account registration for the game portal. A submitted form becomes
//! a job on an in-process queue; the job stores a pending account and emails
//! a single-use token. Consuming the token promotes the pending account into
//! the game's account table.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │   Handlers   │  ← POST /register, /verify-email, /resend-verification
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐     ┌──────────────┐
//! │ Queue /      │────▶│    Mailer    │  ← EmailProvider + templates
//! │ Verification │     └──────────────┘
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │ AccountStore │  ← trait + in-memory / PostgreSQL implementations
//! └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_registration::{
//!     handlers::{self, RegistrationState},
//!     InMemoryAccountStore, QueueConfig, RegistrationQueue, ResendCooldown,
//!     VerificationMailer, VerificationService,
//! };
//!
//! let store = Arc::new(InMemoryAccountStore::new());
//! let queue = RegistrationQueue::new(store.clone(), mailer.clone(), QueueConfig::default());
//! let verification =
//!     VerificationService::new(store, mailer, Arc::new(ResendCooldown::default()));
//!
//! let router = handlers::router(RegistrationState { queue, verification });
//! ```

pub mod cooldown;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod postgres_repository;
pub mod queue;
pub mod repository;
pub mod service;
pub mod token;

pub use cooldown::{CooldownConfig, ResendCooldown};
pub use error::{ErrorKind, RegistrationError, RegistrationResult, StoreError, StoreResult};
pub use handlers::{RegistrationState, router};
pub use mailer::{MailerConfig, VerificationMailer};
pub use models::{
    ClientMeta, ConfirmedAccount, FailedJob, PendingAccount, QueueStats, RegistrationJob,
    RegistrationSubmission, VerificationAction, VerificationLogEntry,
};
pub use postgres_repository::PostgresAccountStore;
pub use queue::{QueueConfig, RegistrationQueue};
pub use repository::{AccountStore, InMemoryAccountStore};
pub use service::{ResendOutcome, VerificationService};
pub use token::{IssuedToken, mask_email};
