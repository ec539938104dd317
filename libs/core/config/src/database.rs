use crate::{env_parse, env_required, ConfigError, FromEnv};

/// Connection settings for the account database
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Attempts made by the query executor before a statement error is surfaced.
    pub query_retries: u32,
}

impl DatabaseConfig {
    pub fn new(url: String) -> Self {
        Self {
            url,
            max_connections: 20,
            query_retries: 3,
        }
    }
}

impl FromEnv for DatabaseConfig {
    /// `DATABASE_URL` is required; `DB_MAX_CONNECTIONS` and `DB_QUERY_RETRIES` are optional.
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_required("DATABASE_URL")?,
            max_connections: env_parse("DB_MAX_CONNECTIONS", 20)?,
            query_retries: env_parse("DB_QUERY_RETRIES", 3)?,
        })
    }
}
