//! JSON extractor with automatic validation using the validator crate.

use crate::errors::error_response;
use axum::{
    extract::{FromRequest, Json, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

/// JSON extractor with automatic validation.
///
/// Validates the request body using the `validator` crate's `Validate` trait.
/// Rejections use the portal's `{ "success": false, "error": ... }` shape,
/// with the validator messages joined into `error`.
///
/// # Example
/// ```ignore
/// use axum::Router;
/// use axum::routing::post;
/// use axum_helpers::extractors::ValidatedJson;
/// use serde::Deserialize;
/// use validator::Validate;
///
/// #[derive(Deserialize, Validate)]
/// struct Register {
///     #[validate(length(min = 4, max = 10, message = "El usuario debe tener entre 4 y 10 caracteres"))]
///     username: String,
///     #[validate(email)]
///     email: String,
/// }
///
/// async fn register(ValidatedJson(payload): ValidatedJson<Register>) -> String {
///     format!("Registering: {}", payload.username)
/// }
///
/// let app = Router::new().route("/register", post(register));
/// ```
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await.map_err(|e| {
            tracing::debug!(error = %e.body_text(), "Rejected request body");
            let status = e.status();
            if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
                e.into_response()
            } else {
                error_response(StatusCode::BAD_REQUEST, "Solicitud inválida")
            }
        })?;

        data.validate()
            .map_err(|e| error_response(StatusCode::BAD_REQUEST, validation_message(&e)))?;

        Ok(ValidatedJson(data))
    }
}

/// Join the field messages, sorted by field name for a stable output.
fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let messages: Vec<String> = fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(message) => message.to_string(),
                None => format!("Campo inválido: {}", field),
            })
        })
        .collect();

    if messages.is_empty() {
        "Datos inválidos".to_string()
    } else {
        messages.join(". ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request as HttpRequest, routing::post};
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize, Validate)]
    struct Input {
        #[validate(length(min = 4, message = "demasiado corto"))]
        name: String,
        #[validate(email)]
        email: String,
    }

    async fn handler(ValidatedJson(input): ValidatedJson<Input>) -> String {
        input.name
    }

    async fn send(body: &str) -> (StatusCode, serde_json::Value) {
        let app = Router::new().route("/", post(handler));
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let (status, _) = send(r#"{"name":"alice","email":"alice@example.com"}"#).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_validation_failure_shape() {
        let (status, body) = send(r#"{"name":"al","email":"nope"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Campo inválido: email. demasiado corto");
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let (status, body) = send("{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Solicitud inválida");
    }
}
