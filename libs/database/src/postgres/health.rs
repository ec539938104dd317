use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};
use tracing::debug;

use crate::common::DatabaseError;

/// `SELECT 1` against the pool; used by the readiness endpoint.
pub async fn check_health(db: &DatabaseConnection) -> Result<(), DatabaseError> {
    let stmt = Statement::from_string(DatabaseBackend::Postgres, "SELECT 1".to_owned());
    db.query_one_raw(stmt)
        .await
        .map_err(|e| DatabaseError::HealthCheckFailed(e.to_string()))?;

    debug!("PostgreSQL health check passed");
    Ok(())
}

/// Verify that every table in `tables` can be read.
///
/// The account tables are owned by the game server, not by this service, so
/// a missing table is reported at startup instead of on the first registration.
pub async fn check_tables(db: &DatabaseConnection, tables: &[&str]) -> Result<(), DatabaseError> {
    for table in tables {
        let sql = format!(r#"SELECT 1 FROM "{}" LIMIT 1"#, table);
        let stmt = Statement::from_string(DatabaseBackend::Postgres, sql);
        db.query_one_raw(stmt).await.map_err(|e| {
            DatabaseError::HealthCheckFailed(format!("table {} is not readable: {}", table, e))
        })?;
    }

    debug!(tables = tables.len(), "Account tables reachable");
    Ok(())
}
