use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use domain_notifications::NotificationError;
use serde_json::json;
use strum::{AsRefStr, Display};
use thiserror::Error;

/// Failures reported by an [`AccountStore`](crate::repository::AccountStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection lost, pool exhausted or any other query failure.
    #[error("Account store unavailable: {0}")]
    Unavailable(String),

    /// The database rejected a row because its key already exists.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Stable discriminant of a [`RegistrationError`], used for logs, metric
/// labels and dead-letter records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    UserExists,
    PendingExists,
    TokenNotFound,
    TokenExpired,
    UserAlreadyExists,
    EmailNotFound,
    UsernameNotFound,
    MissingToken,
    MissingIdentifier,
    CooldownActive,
    Config,
    Store,
    Email,
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A confirmed account already owns the username (job processing).
    #[error("User '{0}' already exists")]
    UserExists(String),

    /// A pending registration already holds the username.
    #[error("Pending registration for '{0}' already exists")]
    PendingExists(String),

    #[error("Verification token not found")]
    TokenNotFound,

    #[error("Verification token expired")]
    TokenExpired,

    /// A confirmed account appeared between registration and verification.
    #[error("User '{0}' was already confirmed")]
    UserAlreadyExists(String),

    #[error("No pending registration for that email")]
    EmailNotFound,

    #[error("No pending registration for that username")]
    UsernameNotFound,

    #[error("Verification token is required")]
    MissingToken,

    #[error("Username or email is required")]
    MissingIdentifier,

    #[error("Resend cooldown active for {remaining_secs}s")]
    CooldownActive { remaining_secs: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Email delivery failed: {0}")]
    Email(#[from] NotificationError),
}

pub type RegistrationResult<T> = Result<T, RegistrationError>;

impl RegistrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistrationError::UserExists(_) => ErrorKind::UserExists,
            RegistrationError::PendingExists(_) => ErrorKind::PendingExists,
            RegistrationError::TokenNotFound => ErrorKind::TokenNotFound,
            RegistrationError::TokenExpired => ErrorKind::TokenExpired,
            RegistrationError::UserAlreadyExists(_) => ErrorKind::UserAlreadyExists,
            RegistrationError::EmailNotFound => ErrorKind::EmailNotFound,
            RegistrationError::UsernameNotFound => ErrorKind::UsernameNotFound,
            RegistrationError::MissingToken => ErrorKind::MissingToken,
            RegistrationError::MissingIdentifier => ErrorKind::MissingIdentifier,
            RegistrationError::CooldownActive { .. } => ErrorKind::CooldownActive,
            RegistrationError::Config(_) => ErrorKind::Config,
            RegistrationError::Email(err) if err.is_config() => ErrorKind::Config,
            RegistrationError::Store(_) => ErrorKind::Store,
            RegistrationError::Email(_) => ErrorKind::Email,
        }
    }

    /// Whether a registration job failing with this error must not be retried.
    ///
    /// Only store outages and provider failures are worth another attempt.
    pub fn is_permanent(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Store | ErrorKind::Email)
    }

    fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::TokenNotFound
            | ErrorKind::TokenExpired
            | ErrorKind::UserAlreadyExists
            | ErrorKind::MissingToken
            | ErrorKind::MissingIdentifier => StatusCode::BAD_REQUEST,
            ErrorKind::EmailNotFound | ErrorKind::UsernameNotFound => StatusCode::NOT_FOUND,
            ErrorKind::UserExists | ErrorKind::PendingExists => StatusCode::CONFLICT,
            ErrorKind::CooldownActive => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Config | ErrorKind::Store | ErrorKind::Email => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// User-facing message. Never includes store or provider details.
    pub fn public_message(&self) -> String {
        match self {
            RegistrationError::UserExists(_) => {
                "El nombre de usuario ya está registrado".to_string()
            }
            RegistrationError::PendingExists(_) => {
                "Ya existe un registro pendiente de verificación para este usuario".to_string()
            }
            RegistrationError::TokenNotFound => {
                "Token inválido o la cuenta ya ha sido verificada".to_string()
            }
            RegistrationError::TokenExpired => {
                "El token de verificación ha expirado. Solicita un nuevo correo de verificación"
                    .to_string()
            }
            RegistrationError::UserAlreadyExists(_) => {
                "La cuenta ya existe. Puedes iniciar sesión".to_string()
            }
            RegistrationError::EmailNotFound => {
                "No se encontró un registro pendiente con ese correo electrónico".to_string()
            }
            RegistrationError::UsernameNotFound => {
                "No se encontró un registro pendiente con ese nombre de usuario".to_string()
            }
            RegistrationError::MissingToken => "Token de verificación requerido".to_string(),
            RegistrationError::MissingIdentifier => {
                "Usuario o correo electrónico requerido".to_string()
            }
            RegistrationError::CooldownActive { remaining_secs } => format!(
                "Por favor espera {} segundos antes de solicitar otro correo",
                remaining_secs
            ),
            _ if self.kind() == ErrorKind::Config => {
                "Error de configuración del servidor".to_string()
            }
            RegistrationError::Email(_) => {
                "No se pudo enviar el correo de verificación".to_string()
            }
            _ => "Error interno del servidor".to_string(),
        }
    }
}

impl IntoResponse for RegistrationError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, kind = %self.kind(), "Registration request failed");
        } else {
            tracing::debug!(error = %self, kind = %self.kind(), "Registration request rejected");
        }

        let body = Json(json!({
            "success": false,
            "error": self.public_message(),
        }));

        let mut response = (status, body).into_response();
        if let RegistrationError::CooldownActive { remaining_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&remaining_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
