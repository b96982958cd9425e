//! API error handling
//!
//! Author: hephaex@gmail.com

use crate::auth::jwt::TokenError;
use crate::auth::password::PasswordError;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Message shared by every authentication failure
pub const UNAUTHORIZED_MESSAGE: &str = "Could not validate credentials";

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new("NOT_FOUND", format!("{resource} not found"))
    }

    pub fn unauthorized() -> Self {
        Self::new("UNAUTHORIZED", UNAUTHORIZED_MESSAGE)
    }

    pub fn forbidden() -> Self {
        Self::new("FORBIDDEN", "Access denied")
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
///
/// The first six variants are authentication failures. They are kept apart
/// for logging and tests but render the same response, so a caller cannot
/// tell an unknown user from a bad password or a revoked token.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    Expired,

    #[error("Wrong token type")]
    WrongTokenType,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Temporarily unavailable: {0}")]
    Transient(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AppError::InvalidCredentials
                | AppError::InvalidToken
                | AppError::Expired
                | AppError::WrongTokenType
                | AppError::InvalidRefreshToken
                | AppError::Unauthorized
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            e if e.is_auth_failure() => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = match self {
            e if e.is_auth_failure() => ApiError::unauthorized(),
            AppError::Forbidden(reason) => ApiError {
                details: Some(reason),
                ..ApiError::forbidden()
            },
            AppError::NotFound(resource) => ApiError::not_found(&resource),
            AppError::Conflict(msg) => ApiError::new("CONFLICT", msg),
            AppError::Validation(msg) => ApiError::new("VALIDATION_ERROR", msg),
            AppError::Transient(_) => {
                ApiError::new("SERVICE_UNAVAILABLE", "Temporarily unavailable, retry later")
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ApiError::internal_error()
            }
            _ => ApiError::internal_error(),
        };

        let mut response = (status, Json(error)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken => AppError::InvalidToken,
            TokenError::Expired => AppError::Expired,
            TokenError::WrongTokenType => AppError::WrongTokenType,
            other => AppError::Internal(format!("Token error: {other}")),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound("Record".to_string()),
            StoreError::Duplicate(msg) => AppError::Conflict(msg),
            StoreError::Stale => AppError::Conflict("Record changed concurrently".to_string()),
            StoreError::Transient(msg) => AppError::Transient(msg),
            StoreError::Backend(msg) => AppError::Internal(format!("Storage error: {msg}")),
        }
    }
}

impl From<fishclaim_core::CoreError> for AppError {
    fn from(err: fishclaim_core::CoreError) -> Self {
        use fishclaim_core::CoreError;

        match err {
            CoreError::InvalidRole(value) => AppError::Validation(format!("Invalid role: {value}")),
            CoreError::InvalidClaimStatus(value) => {
                AppError::Validation(format!("Invalid status: {value}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failures_are_indistinguishable() {
        for err in [
            AppError::InvalidCredentials,
            AppError::InvalidToken,
            AppError::Expired,
            AppError::WrongTokenType,
            AppError::InvalidRefreshToken,
            AppError::Unauthorized,
        ] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(
                response.headers().get(axum::http::header::WWW_AUTHENTICATE).unwrap(),
                "Bearer"
            );
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound("Claim".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("dup".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Transient("busy".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_token_error_conversion() {
        assert!(matches!(
            AppError::from(TokenError::Expired),
            AppError::Expired
        ));
        assert!(matches!(
            AppError::from(TokenError::WrongTokenType),
            AppError::WrongTokenType
        ));
    }

    #[test]
    fn test_store_error_conversion() {
        assert!(matches!(
            AppError::from(StoreError::Duplicate("email".into())),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(StoreError::Transient("deadlock".into())),
            AppError::Transient(_)
        ));
    }

    #[test]
    fn test_api_error_serialization() {
        let json = serde_json::to_value(ApiError::unauthorized()).unwrap();
        assert_eq!(json["code"], "UNAUTHORIZED");
        assert_eq!(json["message"], "Could not validate credentials");
        assert!(json.get("details").is_none());
    }

    #[tokio::test]
    async fn test_forbidden_carries_reason() {
        let response = AppError::Forbidden("Not enough permissions".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "FORBIDDEN");
        assert_eq!(json["details"], "Not enough permissions");
    }
}
