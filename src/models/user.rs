use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// User from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Register a new account with email and password
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "passwords_match", skip_on_field_errors = false))]
pub struct RegisterRequest {
    /// Display name
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "María Gómez")]
    pub name: String,

    /// Valid email address
    #[validate(email)]
    #[schema(example = "maria@example.com")]
    pub email: String,

    /// Password (minimum 8 characters)
    #[validate(length(min = 8))]
    #[schema(example = "SecurePass123!")]
    pub password: String,

    /// Must repeat `password`
    #[schema(example = "SecurePass123!")]
    pub confirm_password: String,

    /// Terms and conditions must be accepted
    #[schema(example = true)]
    pub terms_accepted: bool,
}

fn passwords_match(req: &RegisterRequest) -> Result<(), ValidationError> {
    if req.password != req.confirm_password {
        let mut err = ValidationError::new("password_mismatch");
        err.message = Some("Passwords do not match".into());
        return Err(err);
    }
    Ok(())
}

/// Successful registration response
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    /// Unique user identifier
    pub user_id: Uuid,
    /// Email address
    pub email: String,
    /// Success message
    pub message: String,
}

/// Login with email and password
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    #[schema(example = "maria@example.com")]
    pub email: String,

    #[validate(length(min = 1))]
    #[schema(example = "SecurePass123!")]
    pub password: String,
}

/// Successful login response; the same token is also set as the session cookie
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// JWT access token
    pub access_token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Token expiration time in seconds
    pub expires_in: i64,
}

/// Verify the code mailed after registration
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyOtpRequest {
    #[validate(email)]
    #[schema(example = "maria@example.com")]
    pub email: String,

    /// 6-digit OTP code
    #[validate(length(equal = 6))]
    #[schema(example = "123456")]
    pub code: String,
}

/// OTP verification result
#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyOtpResponse {
    pub message: String,
    pub verified: bool,
}

/// Ask for a new verification code
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResendOtpRequest {
    #[validate(email)]
    #[schema(example = "maria@example.com")]
    pub email: String,
}

/// The signed-in user and where they stand with their profile
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    /// A profile row exists
    pub has_profile: bool,
    /// Every required profile field is filled in
    pub profile_complete: bool,
}

/// Generic acknowledgement
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(password: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            name: "María".to_string(),
            email: "maria@example.com".to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
            terms_accepted: true,
        }
    }

    #[test]
    fn matching_passwords_validate() {
        assert!(request("SecurePass123!", "SecurePass123!").validate().is_ok());
    }

    #[test]
    fn mismatched_passwords_fail() {
        assert!(request("SecurePass123!", "SecurePass124!").validate().is_err());
    }

    #[test]
    fn short_password_fails() {
        assert!(request("short", "short").validate().is_err());
    }
}
