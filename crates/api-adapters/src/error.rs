//! JSON error responses: `{"status": <code>, "error": <message>}`.
//!
//! Only credential failures (401) and malformed input (400) keep their own
//! status; every other domain failure leaves as a 500 carrying the handler's
//! message, with the cause logged server-side.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::DomainError;
use serde_json::json;
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn no_auth() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "No auth")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Builds a `map_err` adapter that files a domain failure under `message`.
    pub fn context(message: &'static str) -> impl FnOnce(DomainError) -> ApiError {
        move |err| match err {
            DomainError::Unauthorized(reason) => Self::new(StatusCode::UNAUTHORIZED, reason),
            DomainError::Validation(reason) => Self::bad_request(reason),
            other => {
                error!(error = %other, "{message}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("can't unpack payload: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "status": self.status.as_u16(),
            "error": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}
