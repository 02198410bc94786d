use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Central error type for the whole service.
///
/// Every boundary (Store, LLMProvider, Router, Handler) converts its
/// low-level error into one of these variants; library errors are never
/// returned to the client verbatim.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("rate limit exceeded: {0}")]
    RateLimited { message: String, retry_after_secs: u64 },

    #[error("quota exceeded: {0}")]
    Quota { message: String, retry_after_secs: u64 },

    #[error("request timed out")]
    Timeout,

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl ApiError {
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound(detail.into())
    }

    pub fn validation_error(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }

    pub fn unauthorized() -> Self {
        Self::Unauthorized
    }

    pub fn rate_limited(detail: impl Into<String>, retry_after_secs: u64) -> Self {
        Self::RateLimited { message: detail.into(), retry_after_secs }
    }

    pub fn quota_exceeded(detail: impl Into<String>, retry_after_secs: u64) -> Self {
        Self::Quota { message: detail.into(), retry_after_secs }
    }

    pub fn service_unavailable(detail: impl Into<String>) -> Self {
        Self::ServiceUnavailable(detail.into())
    }

    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }

    fn status_and_message(&self) -> (StatusCode, String, Option<u64>) {
        match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            Self::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone(), None),
            Self::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "invalid credentials".to_string(), None)
            },
            Self::RateLimited { message, retry_after_secs } => {
                (StatusCode::TOO_MANY_REQUESTS, message.clone(), Some(*retry_after_secs))
            },
            Self::Quota { message, retry_after_secs } => {
                (StatusCode::TOO_MANY_REQUESTS, message.clone(), Some(*retry_after_secs))
            },
            Self::Timeout => {
                (StatusCode::REQUEST_TIMEOUT, "request timed out".to_string(), None)
            },
            Self::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone(), None),
            // Never leak the underlying message to the client; it is still logged by From impls.
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "an internal error occurred".to_string(),
                None,
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        let (status, detail, retry_after) = self.status_and_message();
        let body =
            ErrorBody { error: status.canonical_reason().unwrap_or("error").to_string(), detail, retry_after };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("row not found".to_string()),
            other => {
                tracing::error!(error = %other, "database error");
                ApiError::Internal(other.to_string())
            },
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Validation(format!("invalid JSON: {err}"))
    }
}
