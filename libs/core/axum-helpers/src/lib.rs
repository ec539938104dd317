//! # Axum Helpers
//!
//! Shared building blocks for the portal's Axum services.
//!
//! ## Modules
//!
//! - **[`server`]**: Router assembly, health endpoint, graceful shutdown
//! - **[`extractors`]**: Validated JSON bodies and client metadata
//! - **[`errors`]**: The `{ "success": false, "error": ... }` response shape
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum::Router;
//! use axum_helpers::server::{create_app, create_router, health_router, AppInfo};
//! use core_config::server::ServerConfig;
//! use utoipa::OpenApi;
//!
//! #[derive(OpenApi)]
//! #[openapi(paths())]
//! struct ApiDoc;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let api_routes = Router::new(); // Add your routes
//!     let router = create_router::<ApiDoc>(api_routes, &["http://localhost:3000".into()])?
//!         .merge(health_router(AppInfo::new("portal", "0.1.0")));
//!
//!     create_app(router, &ServerConfig::default()).await
//! }
//! ```

pub mod errors;
pub mod extractors;
pub mod server;

// Re-export server types
pub use server::{
    AppInfo, HealthCheckFuture, HealthResponse, create_app, create_router, health_router,
    run_health_checks, shutdown_signal,
};

// Re-export error helpers
pub use errors::{error_response, not_found};

// Re-export extractors
pub use extractors::{ClientInfo, ValidatedJson, extract_ip_from_headers, extract_user_agent};
