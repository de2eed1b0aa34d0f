use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::utils::external::ExternalError;

/// Application-wide error type
#[derive(Debug)]
pub enum AppError {
    // Database errors
    DatabaseError(sqlx::Error),

    // Authentication errors
    InvalidCredentials,
    InvalidToken,
    TokenExpired,
    Unauthorized,
    EmailNotConfirmed,

    // Validation errors
    ValidationError(String),

    // User errors
    UserAlreadyExists,
    UserNotFound,

    // OTP errors
    InvalidOtp,
    OtpExpired,

    // Domain lookups
    ProfileNotFound,
    IncidentNotFound,

    // Maps / OAuth / email providers
    Upstream(ExternalError),

    // Internal errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired".to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::EmailNotConfirmed => (
                StatusCode::CONFLICT,
                "Email is registered but not confirmed. A new verification code was sent; \
                 sign in with the password chosen when the account was first registered."
                    .to_string(),
            ),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::UserAlreadyExists => {
                (StatusCode::CONFLICT, "User already exists".to_string())
            }
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
            AppError::InvalidOtp => (StatusCode::BAD_REQUEST, "Invalid OTP code".to_string()),
            AppError::OtpExpired => (StatusCode::BAD_REQUEST, "OTP code expired".to_string()),
            AppError::ProfileNotFound => {
                (StatusCode::NOT_FOUND, "Profile not found".to_string())
            }
            AppError::IncidentNotFound => {
                (StatusCode::NOT_FOUND, "Incident not found".to_string())
            }
            AppError::Upstream(e) => {
                tracing::error!("Upstream provider error: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "External service unavailable".to_string(),
                )
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::DatabaseError(e)
    }
}

impl From<ExternalError> for AppError {
    fn from(e: ExternalError) -> Self {
        AppError::Upstream(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_is_bad_request() {
        let response = AppError::ValidationError("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_error_is_bad_gateway() {
        let response = AppError::Upstream(ExternalError::Status {
            service: "places",
            status: "REQUEST_DENIED".to_string(),
            message: None,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn unconfirmed_email_keeps_original_credentials() {
        let response = AppError::EmailNotConfirmed.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("new verification code"));
        assert!(message.contains("password chosen when the account was first registered"));
    }

    #[test]
    fn missing_rows_map_to_not_found() {
        assert_eq!(
            AppError::IncidentNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::ProfileNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
