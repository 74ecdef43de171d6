use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde_json::json;

/// Domain error taxonomy for HTTP handlers.
///
/// Every variant maps to a 4xx/5xx JSON body at the request boundary;
/// internal detail never leaks past `Internal`, which is logged here.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("insufficient privileges")]
    Forbidden,

    #[error("username or email already in use")]
    DuplicateAccount,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is banned")]
    AccountBanned {
        reason: Option<String>,
        expires: Option<DateTime<Utc>>,
    },

    #[error("promo code already exists")]
    DuplicateCode,

    #[error("reward must be a positive amount")]
    InvalidReward,

    #[error("promo code not found")]
    CodeNotFound,

    #[error("promo code exhausted")]
    CodeExhausted,

    #[error("too many requests")]
    RateLimited,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience type alias for handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            ApiError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", self.to_string())
            }
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", self.to_string()),
            ApiError::DuplicateAccount => {
                (StatusCode::CONFLICT, "DUPLICATE_ACCOUNT", self.to_string())
            }
            ApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", self.to_string())
            }
            ApiError::AccountBanned { reason, expires } => {
                // Carries the ban context for client display.
                let body = json!({
                    "error": self.to_string(),
                    "code": "ACCOUNT_BANNED",
                    "ban_reason": reason,
                    "ban_expires": expires,
                });
                return (StatusCode::FORBIDDEN, axum::Json(body)).into_response();
            }
            ApiError::DuplicateCode => (StatusCode::CONFLICT, "DUPLICATE_CODE", self.to_string()),
            ApiError::InvalidReward => {
                (StatusCode::BAD_REQUEST, "INVALID_REWARD", self.to_string())
            }
            ApiError::CodeNotFound => (StatusCode::NOT_FOUND, "CODE_NOT_FOUND", self.to_string()),
            ApiError::CodeExhausted => (StatusCode::CONFLICT, "CODE_EXHAUSTED", self.to_string()),
            ApiError::RateLimited => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", self.to_string())
            }
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
