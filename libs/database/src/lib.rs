//! Database access for the account store.
//!
//! The registration core never manages connections itself. It hands closures
//! to [`postgres::QueryExecutor`], which runs them against the pool and
//! retries the whole closure when the failure is a connection problem.
//!
//! ```ignore
//! use database::postgres::{self, QueryExecutor};
//! use core_config::{database::DatabaseConfig, FromEnv};
//!
//! let config = DatabaseConfig::from_env()?;
//! let db = postgres::connect_with_retry(&config).await?;
//! let executor = QueryExecutor::new(db, config.query_retries);
//! ```

pub mod common;
pub mod postgres;

pub use common::{DatabaseError, DatabaseResult};
