//! Notifications Domain
//!
//! Outbound email for the account portal: the `EmailProvider` seam, the
//! Resend HTTP provider and the Handlebars templates for verification mail.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_notifications::{
//!     providers::{EmailContent, EmailProvider, ResendProvider},
//!     templates::{TemplateEngine, VerificationEmailData},
//! };
//!
//! let provider = ResendProvider::from_env()?;
//! let templates = TemplateEngine::new()?;
//!
//! let rendered = templates.render_verification(&data)?;
//! provider.send(&EmailContent::from_rendered("alice@example.com", rendered)).await?;
//! ```

pub mod error;
pub mod providers;
pub mod templates;

pub use error::{NotificationError, NotificationResult};
pub use providers::{EmailContent, EmailProvider, ResendProvider, SentEmail};
pub use templates::{RenderedEmail, TemplateEngine, VerificationEmailData};
