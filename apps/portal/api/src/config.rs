use axum_helpers::AppInfo;
use core_config::{
    ConfigError, FromEnv, database::DatabaseConfig, env_or_default, env_parse, env_required,
    server::ServerConfig,
};
use domain_registration::{MailerConfig, QueueConfig};

// Re-export Environment for use in other modules
pub use core_config::Environment;

/// Registration tuning read from `REGISTRATION_*`.
#[derive(Clone, Debug)]
pub struct RegistrationSettings {
    pub max_concurrent: usize,
    pub max_retries: u32,
}

impl RegistrationSettings {
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            max_concurrent: self.max_concurrent,
            max_retries: self.max_retries,
            ..QueueConfig::default()
        }
    }
}

impl FromEnv for RegistrationSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = QueueConfig::default();
        let max_concurrent = env_parse("REGISTRATION_MAX_CONCURRENT", defaults.max_concurrent)?;
        if max_concurrent == 0 {
            return Err(ConfigError::ParseError {
                key: "REGISTRATION_MAX_CONCURRENT".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            max_concurrent,
            max_retries: env_parse("REGISTRATION_MAX_RETRIES", defaults.max_retries)?,
        })
    }
}

/// Application-specific configuration
/// Composes shared config components from the `core_config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub environment: Environment,
    pub mailer: MailerConfig,
    pub registration: RegistrationSettings,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_env();
        let database = DatabaseConfig::from_env()?; // Required - will fail if not set
        let server = ServerConfig::from_env()?; // Uses defaults: HOST=0.0.0.0, PORT=3000

        let mailer = MailerConfig {
            base_url: env_required("APP_BASE_URL")?,
            server_name: env_or_default("SERVER_NAME", "MuOnline"),
        };

        let cors_origins = env_or_default("CORS_ALLOWED_ORIGIN", &mailer.base_url)
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            app: AppInfo::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            database,
            server,
            environment,
            mailer,
            registration: RegistrationSettings::from_env()?,
            cors_origins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: [(&str, Option<&str>); 7] = [
        ("DATABASE_URL", Some("postgres://localhost/mu")),
        ("APP_BASE_URL", Some("https://mu.example.com")),
        ("SERVER_NAME", None),
        ("CORS_ALLOWED_ORIGIN", None),
        ("REGISTRATION_MAX_CONCURRENT", None),
        ("REGISTRATION_MAX_RETRIES", None),
        ("PORT", None),
    ];

    #[test]
    fn test_defaults() {
        temp_env::with_vars(BASE, || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.mailer.base_url, "https://mu.example.com");
            assert_eq!(config.mailer.server_name, "MuOnline");
            assert_eq!(config.cors_origins, vec!["https://mu.example.com"]);
            assert_eq!(config.registration.max_concurrent, 50);
            assert_eq!(config.registration.max_retries, 3);
            assert_eq!(config.server.port, 3000);
            assert_eq!(config.app.name, "portal_api");
        });
    }

    #[test]
    fn test_overrides() {
        temp_env::with_vars(BASE, || {
            temp_env::with_vars(
                [
                    ("SERVER_NAME", Some("Season6")),
                    (
                        "CORS_ALLOWED_ORIGIN",
                        Some("http://localhost:5173, https://mu.example.com"),
                    ),
                    ("REGISTRATION_MAX_CONCURRENT", Some("8")),
                    ("REGISTRATION_MAX_RETRIES", Some("1")),
                ],
                || {
                    let config = Config::from_env().unwrap();
                    assert_eq!(config.mailer.server_name, "Season6");
                    assert_eq!(
                        config.cors_origins,
                        vec!["http://localhost:5173", "https://mu.example.com"]
                    );

                    let queue = config.registration.queue_config();
                    assert_eq!(queue.max_concurrent, 8);
                    assert_eq!(queue.max_retries, 1);
                },
            );
        });
    }

    #[test]
    fn test_base_url_is_required() {
        temp_env::with_vars(BASE, || {
            temp_env::with_var_unset("APP_BASE_URL", || {
                let err = Config::from_env().unwrap_err();
                assert!(err.to_string().contains("APP_BASE_URL"));
            });
        });
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        temp_env::with_vars(BASE, || {
            temp_env::with_var("REGISTRATION_MAX_CONCURRENT", Some("0"), || {
                let err = Config::from_env().unwrap_err();
                assert!(err.to_string().contains("REGISTRATION_MAX_CONCURRENT"));
            });
        });
    }

    #[test]
    fn test_invalid_retry_count() {
        temp_env::with_vars(BASE, || {
            temp_env::with_var("REGISTRATION_MAX_RETRIES", Some("many"), || {
                assert!(matches!(
                    Config::from_env(),
                    Err(ConfigError::ParseError { .. })
                ));
            });
        });
    }
}
