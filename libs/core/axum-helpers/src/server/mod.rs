//! Server infrastructure module.
//!
//! This module provides:
//! - Router assembly with the OpenAPI document, CORS and compression
//! - Health and readiness endpoints
//! - Graceful shutdown on SIGINT/SIGTERM
//!
//! # Example
//!
//! ```ignore
//! use axum_helpers::server::{create_app, create_router, health_router, AppInfo};
//! use core_config::server::ServerConfig;
//!
//! let router = create_router::<ApiDoc>(api_routes, &origins)?
//!     .merge(health_router(AppInfo::new("portal", "0.1.0")));
//!
//! create_app(router, &ServerConfig::default()).await?;
//! ```

pub mod app;
pub mod health;
pub mod shutdown;

pub use app::{create_app, create_router};
pub use health::{AppInfo, HealthCheckFuture, HealthResponse, health_router, run_health_checks};
pub use shutdown::shutdown_signal;
