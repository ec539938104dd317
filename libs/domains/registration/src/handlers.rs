use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_helpers::{ClientInfo, ValidatedJson};
use utoipa::OpenApi;

use crate::error::RegistrationResult;
use crate::models::{
    ClientMeta, ErrorBody, QueueStats, RegisterRequest, RegisterResponse,
    RegistrationSubmission, ResendVerificationRequest, ResendVerificationResponse,
    VerifyEmailRequest, VerifyEmailResponse,
};
use crate::queue::RegistrationQueue;
use crate::service::VerificationService;

const TAG: &str = "registration";

/// OpenAPI documentation for the registration API
#[derive(OpenApi)]
#[openapi(
    paths(register, verify_email, resend_verification, queue_stats),
    components(schemas(
        RegisterRequest,
        RegisterResponse,
        VerifyEmailRequest,
        VerifyEmailResponse,
        ResendVerificationRequest,
        ResendVerificationResponse,
        QueueStats,
        ErrorBody
    )),
    tags((name = TAG, description = "Account registration and email verification"))
)]
pub struct ApiDoc;

/// Everything the registration endpoints need.
#[derive(Clone)]
pub struct RegistrationState {
    pub queue: RegistrationQueue,
    pub verification: VerificationService,
}

impl From<ClientInfo> for ClientMeta {
    fn from(info: ClientInfo) -> Self {
        Self {
            ip_address: info.ip_address,
            user_agent: info.user_agent,
        }
    }
}

/// Create the registration router with all HTTP endpoints
pub fn router(state: RegistrationState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/verify-email", post(verify_email))
        .route("/resend-verification", post(resend_verification))
        .route("/registration/stats", get(queue_stats))
        .with_state(state)
}

/// Queue a new account registration
#[utoipa::path(
    post,
    path = "/register",
    tag = TAG,
    request_body = RegisterRequest,
    responses(
        (status = 202, description = "Registration queued", body = RegisterResponse),
        (status = 400, description = "Invalid registration data", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<RegistrationState>,
    client: ClientInfo,
    ValidatedJson(input): ValidatedJson<RegisterRequest>,
) -> impl IntoResponse {
    let submission = RegistrationSubmission::new(input.username, input.password, input.email)
        .with_client(client.ip_address, client.user_agent);
    let job_id = state.queue.submit(submission);

    (
        StatusCode::ACCEPTED,
        Json(RegisterResponse {
            success: true,
            message: "Registro recibido. Revisa tu correo electrónico para verificar tu cuenta"
                .to_string(),
            job_id,
        }),
    )
}

/// Consume a verification token
#[utoipa::path(
    post,
    path = "/verify-email",
    tag = TAG,
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Account verified", body = VerifyEmailResponse),
        (status = 400, description = "Missing, unknown or expired token", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody)
    )
)]
pub async fn verify_email(
    State(state): State<RegistrationState>,
    client: ClientInfo,
    payload: Result<Json<VerifyEmailRequest>, JsonRejection>,
) -> RegistrationResult<Json<VerifyEmailResponse>> {
    // An unreadable body is reported as a missing token.
    let request = payload.map(|Json(req)| req).unwrap_or_default();

    let username = state
        .verification
        .verify(request.token.as_deref(), &client.into())
        .await?;

    Ok(Json(VerifyEmailResponse {
        success: true,
        message: "¡Cuenta verificada exitosamente! Ya puedes iniciar sesión".to_string(),
        username,
    }))
}

/// Resend the verification email
#[utoipa::path(
    post,
    path = "/resend-verification",
    tag = TAG,
    request_body = ResendVerificationRequest,
    responses(
        (status = 200, description = "Email sent", body = ResendVerificationResponse),
        (status = 400, description = "Missing identifier", body = ErrorBody),
        (status = 404, description = "No pending registration", body = ErrorBody),
        (status = 429, description = "Cooldown active", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody)
    )
)]
pub async fn resend_verification(
    State(state): State<RegistrationState>,
    client: ClientInfo,
    payload: Result<Json<ResendVerificationRequest>, JsonRejection>,
) -> RegistrationResult<Json<ResendVerificationResponse>> {
    let request = payload.map(|Json(req)| req).unwrap_or_default();

    let outcome = state
        .verification
        .resend(request.identifier.as_deref(), request.is_email, &client.into())
        .await?;

    Ok(Json(ResendVerificationResponse {
        success: true,
        message: "Correo de verificación reenviado. Revisa tu bandeja de entrada".to_string(),
        email_hint: outcome.email_hint,
    }))
}

/// Registration queue counters
#[utoipa::path(
    get,
    path = "/registration/stats",
    tag = TAG,
    responses(
        (status = 200, description = "Queue statistics", body = QueueStats)
    )
)]
pub async fn queue_stats(State(state): State<RegistrationState>) -> Json<QueueStats> {
    Json(state.queue.get_stats())
}
