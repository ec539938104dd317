use axum::{Router, middleware, routing::get};
use axum_helpers::server::{create_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use database::postgres::QueryExecutor;
use domain_notifications::{ResendProvider, TemplateEngine};
use domain_registration::{
    PostgresAccountStore, RegistrationQueue, RegistrationState, ResendCooldown,
    VerificationMailer, VerificationService, postgres_repository::REQUIRED_TABLES,
};
use observability::{init_metrics, metrics_handler, metrics_middleware};
use std::sync::Arc;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    let config = Config::from_env()?;

    init_tracing(&config.environment);
    init_metrics()?;

    let db = database::postgres::connect_with_retry(&config.database)
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;
    database::postgres::check_tables(&db, REQUIRED_TABLES).await?;

    let store = Arc::new(PostgresAccountStore::new(QueryExecutor::new(
        db.clone(),
        config.database.query_retries,
    )));

    let provider = Arc::new(ResendProvider::from_env()?);
    let mailer = VerificationMailer::new(provider, TemplateEngine::new()?, config.mailer.clone())?;

    let queue = RegistrationQueue::new(
        store.clone(),
        mailer.clone(),
        config.registration.queue_config(),
    );
    let verification =
        VerificationService::new(store, mailer, Arc::new(ResendCooldown::default()));

    let state = AppState {
        config,
        db,
        registration: RegistrationState {
            queue,
            verification,
        },
    };

    let api_routes = api::routes(&state)
        .layer(middleware::from_fn(metrics_middleware));

    let router = create_router::<openapi::ApiDoc>(api_routes, &state.config.cors_origins)?;

    // - /health: liveness with app name/version
    // - /ready: database and account tables reachable
    // - /metrics: Prometheus exposition
    let app = router
        .merge(health_router(state.config.app))
        .merge(api::ready_router(state.clone()))
        .merge(Router::new().route("/metrics", get(metrics_handler)));

    info!(
        server_name = %state.config.mailer.server_name,
        "Starting portal API"
    );

    create_app(app, &state.config.server)
        .await
        .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    match state.db.close().await {
        Ok(()) => info!("PostgreSQL connection closed successfully"),
        Err(e) => tracing::error!("Error closing PostgreSQL: {}", e),
    }

    info!("Portal API shutdown complete");
    Ok(())
}
