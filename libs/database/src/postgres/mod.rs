//! PostgreSQL connector, query executor and health checks

mod connector;
mod health;

pub use connector::{QueryExecutor, connect, connect_with_retry, is_transient};
pub use health::{check_health, check_tables};

pub use sea_orm::{DatabaseConnection, DbErr};
