use core_config::database::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::future::Future;
use std::time::Duration;
use tracing::{info, log::LevelFilter};

use crate::common::{RetryConfig, retry_with_backoff, retry_with_backoff_if};

fn connect_options(config: &DatabaseConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(&config.url);
    opt.max_connections(config.max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug); // SeaORM requires log::LevelFilter
    opt
}

/// Open the pool once.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(connect_options(config)).await?;
    info!(max_connections = config.max_connections, "Connected to PostgreSQL");
    Ok(db)
}

/// Open the pool, retrying with exponential backoff while the server is unreachable.
pub async fn connect_with_retry(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let retry = RetryConfig::new()
        .with_max_retries(config.query_retries.max(1))
        .with_initial_delay(500);

    retry_with_backoff(|| connect(config), retry).await
}

/// True for failures worth another attempt: the pool could not hand out a
/// connection or the connection broke mid-statement.
pub fn is_transient(err: &DbErr) -> bool {
    matches!(err, DbErr::ConnectionAcquire(_) | DbErr::Conn(_))
}

/// Runs statements against the pool, retrying the whole closure on
/// connection failures.
///
/// Constraint violations and other statement errors are returned on the first
/// attempt so the caller can map them.
#[derive(Clone)]
pub struct QueryExecutor {
    db: DatabaseConnection,
    retry: RetryConfig,
}

impl QueryExecutor {
    pub fn new(db: DatabaseConnection, max_retries: u32) -> Self {
        Self {
            db,
            retry: RetryConfig::new()
                .with_max_retries(max_retries)
                .with_initial_delay(200)
                .with_max_delay(2000),
        }
    }

    /// The underlying pool, for health checks and shutdown.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn run<F, Fut, T>(&self, operation: F) -> Result<T, DbErr>
    where
        F: Fn(DatabaseConnection) -> Fut,
        Fut: Future<Output = Result<T, DbErr>>,
    {
        retry_with_backoff_if(
            || operation(self.db.clone()),
            self.retry.clone(),
            is_transient,
        )
        .await
    }
}
