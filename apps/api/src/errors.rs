use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::assistant::forwarder::{FailureKind, ForwardError};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Forward(#[from] ForwardError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, kind, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", None, msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None, msg.clone())
            }
            AppError::Forward(e) => {
                tracing::error!("LLM error: {e}");
                let code = match e.kind() {
                    FailureKind::Authentication => "LLM_AUTH_ERROR",
                    _ => "LLM_ERROR",
                };
                (StatusCode::BAD_GATEWAY, code, Some(e.kind()), e.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "kind": kind,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// `Json` extractor whose rejections come back as `AppError` JSON bodies.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
