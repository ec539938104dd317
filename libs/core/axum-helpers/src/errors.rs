//! Error responses in the portal's JSON shape.
//!
//! Every failure body is `{ "success": false, "error": "<message>" }` so the
//! frontend only has one shape to handle.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Build a failure response with the given status and user-facing message.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = Json(json!({
        "success": false,
        "error": message.into(),
    }));

    (status, body).into_response()
}

/// Handler for 404 Not Found errors.
///
/// This can be used as a fallback handler in your router.
pub async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Recurso no encontrado")
}
