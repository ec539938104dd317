//! PostgreSQL implementation of [`AccountStore`].
//!
//! The tables belong to the game server and are not migrated from here:
//!
//! ```text
//! "PendingAccounts"      (username PK, password, email, verification_token,
//!                         expires_at, created_at, ip_address, user_agent)
//! "MEMB_INFO"            (memb___id PK, memb__pwd, mail_addr, memb_name,
//!                         bloc_code, ctl1_code, sno__numb, ...)
//! "EmailVerificationLog" (email, username, action, ip_address, user_agent,
//!                         details, created_at)
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database::postgres::QueryExecutor;
use sea_orm::{ConnectionTrait, DbBackend, DbErr, FromQueryResult, SqlErr, Statement};

use crate::error::{StoreError, StoreResult};
use crate::models::{ConfirmedAccount, PendingAccount, VerificationLogEntry};
use crate::repository::AccountStore;
use crate::token::IssuedToken;

/// Tables this store reads and writes, for startup checks.
pub const REQUIRED_TABLES: &[&str] = &["PendingAccounts", "MEMB_INFO", "EmailVerificationLog"];

const PENDING_COLUMNS: &str = "username, password, email, verification_token, expires_at, \
                               created_at, ip_address, user_agent";

#[derive(Clone)]
pub struct PostgresAccountStore {
    executor: QueryExecutor,
}

impl PostgresAccountStore {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    async fn find_pending(&self, sql: String, value: String) -> StoreResult<Option<PendingAccount>> {
        let row = self
            .executor
            .run(|db| {
                let stmt = Statement::from_sql_and_values(
                    DbBackend::Postgres,
                    sql.clone(),
                    [value.clone().into()],
                );
                async move { PendingAccountRow::find_by_statement(stmt).one(&db).await }
            })
            .await
            .map_err(map_db_err)?;

        Ok(row.map(Into::into))
    }

    async fn exists(&self, sql: &'static str, value: &str) -> StoreResult<bool> {
        let row = self
            .executor
            .run(|db| {
                let stmt = Statement::from_sql_and_values(
                    DbBackend::Postgres,
                    sql,
                    [value.to_string().into()],
                );
                async move { db.query_one_raw(stmt).await }
            })
            .await
            .map_err(map_db_err)?;

        Ok(row.is_some())
    }

    async fn execute(&self, sql: &'static str, values: Vec<sea_orm::Value>) -> StoreResult<u64> {
        let result = self
            .executor
            .run(|db| {
                let stmt =
                    Statement::from_sql_and_values(DbBackend::Postgres, sql, values.clone());
                async move { db.execute_raw(stmt).await }
            })
            .await
            .map_err(map_db_err)?;

        Ok(result.rows_affected())
    }
}

fn map_db_err(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => StoreError::UniqueViolation(detail),
        _ => StoreError::Unavailable(err.to_string()),
    }
}

#[derive(Debug, FromQueryResult)]
struct PendingAccountRow {
    username: String,
    password: String,
    email: String,
    verification_token: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    ip_address: Option<String>,
    user_agent: Option<String>,
}

impl From<PendingAccountRow> for PendingAccount {
    fn from(row: PendingAccountRow) -> Self {
        Self {
            username: row.username,
            password: row.password,
            email: row.email,
            verification_token: row.verification_token,
            expires_at: row.expires_at,
            created_at: row.created_at,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
        }
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn user_exists(&self, username: &str) -> StoreResult<bool> {
        self.exists(
            r#"SELECT 1 FROM "MEMB_INFO" WHERE memb___id = $1 LIMIT 1"#,
            username,
        )
        .await
    }

    async fn pending_exists(&self, username: &str) -> StoreResult<bool> {
        self.exists(
            r#"SELECT 1 FROM "PendingAccounts" WHERE username = $1 LIMIT 1"#,
            username,
        )
        .await
    }

    async fn insert_pending(&self, account: &PendingAccount) -> StoreResult<()> {
        let sql = r#"
            INSERT INTO "PendingAccounts" (
                username, password, email, verification_token,
                expires_at, created_at, ip_address, user_agent
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#;

        self.execute(
            sql,
            vec![
                account.username.clone().into(),
                account.password.clone().into(),
                account.email.clone().into(),
                account.verification_token.clone().into(),
                account.expires_at.into(),
                account.created_at.into(),
                account.ip_address.clone().into(),
                account.user_agent.clone().into(),
            ],
        )
        .await?;

        Ok(())
    }

    async fn find_pending_by_token(&self, token: &str) -> StoreResult<Option<PendingAccount>> {
        let sql = format!(
            r#"SELECT {PENDING_COLUMNS} FROM "PendingAccounts" WHERE verification_token = $1"#
        );
        self.find_pending(sql, token.to_string()).await
    }

    async fn find_pending_by_username(
        &self,
        username: &str,
    ) -> StoreResult<Option<PendingAccount>> {
        let sql =
            format!(r#"SELECT {PENDING_COLUMNS} FROM "PendingAccounts" WHERE username = $1"#);
        self.find_pending(sql, username.to_string()).await
    }

    async fn find_latest_pending_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Option<PendingAccount>> {
        let sql = format!(
            r#"SELECT {PENDING_COLUMNS} FROM "PendingAccounts"
               WHERE LOWER(email) = LOWER($1)
               ORDER BY created_at DESC
               LIMIT 1"#
        );
        self.find_pending(sql, email.to_string()).await
    }

    async fn update_pending_token(
        &self,
        username: &str,
        token: &IssuedToken,
    ) -> StoreResult<bool> {
        let sql = r#"
            UPDATE "PendingAccounts"
            SET verification_token = $2, expires_at = $3
            WHERE username = $1
        "#;

        let affected = self
            .execute(
                sql,
                vec![
                    username.to_string().into(),
                    token.token.clone().into(),
                    token.expires_at.into(),
                ],
            )
            .await?;

        Ok(affected > 0)
    }

    async fn delete_pending(&self, username: &str) -> StoreResult<bool> {
        let affected = self
            .execute(
                r#"DELETE FROM "PendingAccounts" WHERE username = $1"#,
                vec![username.to_string().into()],
            )
            .await?;

        Ok(affected > 0)
    }

    async fn insert_confirmed(&self, account: &ConfirmedAccount) -> StoreResult<()> {
        let sql = r#"
            INSERT INTO "MEMB_INFO" (
                memb___id, memb__pwd, mail_addr, memb_name,
                bloc_code, ctl1_code, sno__numb
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#;

        self.execute(
            sql,
            vec![
                account.username.clone().into(),
                account.password.clone().into(),
                account.email.clone().into(),
                account.memb_name.clone().into(),
                account.bloc_code.clone().into(),
                account.ctl1_code.clone().into(),
                account.sno_numb.clone().into(),
            ],
        )
        .await?;

        Ok(())
    }

    async fn log_verification(&self, entry: &VerificationLogEntry) -> StoreResult<()> {
        let sql = r#"
            INSERT INTO "EmailVerificationLog" (
                email, username, action, ip_address, user_agent, details, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#;

        self.execute(
            sql,
            vec![
                entry.email.clone().into(),
                entry.username.clone().into(),
                entry.action.as_ref().to_string().into(),
                entry.ip_address.clone().into(),
                entry.user_agent.clone().into(),
                entry.details.clone().into(),
                entry.created_at.into(),
            ],
        )
        .await?;

        Ok(())
    }
}
