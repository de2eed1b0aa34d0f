use axum::{
    Extension, Json,
    extract::State,
    http::{StatusCode, header},
};
use rand::Rng;
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::AppError,
    models::{
        app_state::AppState,
        profile::{Profile, profile_complete},
        user::{
            LoginRequest, LoginResponse, MessageResponse, RegisterRequest, RegisterResponse,
            ResendOtpRequest, SessionResponse, User, VerifyOtpRequest, VerifyOtpResponse,
        },
    },
    utils::{
        cookies::{clear_cookie, session_cookie},
        jwt::issue_session,
        password::{hash_password, verify_password},
    },
};

const OTP_TTL_MINUTES: i64 = 10;

pub(crate) async fn find_user_by_email(
    state: &AppState,
    email: &str,
) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, name, password_hash, is_verified, created_at, updated_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(&state.db)
    .await?;

    Ok(user)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A concurrent sign-up can win the race for the email's unique index
fn registration_conflict(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::UserAlreadyExists,
        e => AppError::DatabaseError(e),
    }
}

/// Store a fresh 6-digit code for `user_id` and mail it
async fn send_verification_code(
    state: &AppState,
    user_id: Uuid,
    email: &str,
) -> Result<(), AppError> {
    let otp_code = rand::rng().random_range(100_000..=999_999).to_string();
    let expires_at = chrono::Utc::now() + chrono::Duration::minutes(OTP_TTL_MINUTES);

    sqlx::query(
        r#"
        INSERT INTO otp_codes (user_id, code, expires_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(user_id)
    .bind(&otp_code)
    .bind(expires_at)
    .execute(&state.db)
    .await?;

    state.mailer.send_verification_code(email, &otp_code).await
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered, verification code sent", body = RegisterResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    if !payload.terms_accepted {
        return Err(AppError::ValidationError(
            "You must accept the terms and conditions".to_string(),
        ));
    }

    let email = normalize_email(&payload.email);

    if let Some(existing) = find_user_by_email(&state, &email).await? {
        if existing.is_verified {
            return Err(AppError::UserAlreadyExists);
        }
        // Registered but never confirmed: send a new code and keep the original
        // name and password.
        send_verification_code(&state, existing.id, &existing.email).await?;
        return Err(AppError::EmailNotConfirmed);
    }

    let password_hash = hash_password(&payload.password).await?;

    let user_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO users (email, name, password_hash)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(&email)
    .bind(payload.name.trim())
    .bind(&password_hash)
    .fetch_one(&state.db)
    .await
    .map_err(registration_conflict)?;

    send_verification_code(&state, user_id, &email).await?;

    tracing::info!("Registered user {}", user_id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            email,
            message: "Registration successful! Please check your email for the verification code."
                .to_string(),
        }),
    ))
}

/// Verify OTP code
#[utoipa::path(
    post,
    path = "/api/v1/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Email verified successfully", body = VerifyOtpResponse),
        (status = 400, description = "Invalid or expired OTP"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Authentication"
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let user = find_user_by_email(&state, &normalize_email(&payload.email))
        .await?
        .ok_or(AppError::UserNotFound)?;

    let (otp_id, expires_at) = sqlx::query_as::<_, (Uuid, chrono::DateTime<chrono::Utc>)>(
        r#"
        SELECT id, expires_at
        FROM otp_codes
        WHERE user_id = $1 AND code = $2 AND is_used = false
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user.id)
    .bind(&payload.code)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::InvalidOtp)?;

    if expires_at < chrono::Utc::now() {
        return Err(AppError::OtpExpired);
    }

    let mut tx = state.db.begin().await?;

    sqlx::query("UPDATE otp_codes SET is_used = true WHERE id = $1")
        .bind(otp_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE users SET is_verified = true, updated_at = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(VerifyOtpResponse {
        message: "Email verified successfully!".to_string(),
        verified: true,
    }))
}

/// Send a new verification code
#[utoipa::path(
    post,
    path = "/api/v1/auth/resend-otp",
    request_body = ResendOtpRequest,
    responses(
        (status = 200, description = "Code sent if the account is awaiting verification", body = MessageResponse),
        (status = 400, description = "Invalid input"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Authentication"
)]
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(payload): Json<ResendOtpRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    // Same answer whether or not the account exists.
    if let Some(user) = find_user_by_email(&state, &normalize_email(&payload.email)).await? {
        if !user.is_verified {
            send_verification_code(&state, user.id, &user.email).await?;
        }
    }

    Ok(Json(MessageResponse::new(
        "If the account is awaiting verification, a new code was sent.",
    )))
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful; session cookie set", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 400, description = "Email not verified"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<([(header::HeaderName, String); 1], Json<LoginResponse>), AppError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let user = find_user_by_email(&state, &normalize_email(&payload.email))
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    // Accounts created through OAuth have no password.
    let password_hash = user
        .password_hash
        .as_deref()
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&payload.password, password_hash).await? {
        return Err(AppError::InvalidCredentials);
    }

    if !user.is_verified {
        return Err(AppError::ValidationError(
            "Please verify your email before logging in".to_string(),
        ));
    }

    let session = issue_session(user.id, &state.config.session)?;
    let cookie = session_cookie(&session.token, session.expires_in, &state.config.session);

    tracing::info!("User {} signed in", user.id);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            access_token: session.token,
            token_type: "Bearer".to_string(),
            expires_in: session.expires_in,
        }),
    ))
}

/// Sign out by clearing the session cookie
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = MessageResponse)
    ),
    tag = "Authentication"
)]
pub async fn logout(
    State(state): State<AppState>,
) -> ([(header::HeaderName, String); 1], Json<MessageResponse>) {
    (
        [(header::SET_COOKIE, clear_cookie(&state.config.session.cookie_name))],
        Json(MessageResponse::new("Signed out")),
    )
}

/// Current session
#[utoipa::path(
    get,
    path = "/api/v1/auth/session",
    responses(
        (status = 200, description = "Signed-in user", body = SessionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Authentication",
    security(("bearer" = []))
)]
pub async fn session(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, name, password_hash, is_verified, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::Unauthorized)?;

    let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?;

    Ok(Json(SessionResponse {
        user_id: user.id,
        email: user.email,
        name: user.name,
        has_profile: profile.is_some(),
        profile_complete: profile_complete(profile.as_ref()),
    }))
}

#[cfg(test)]
mod tests {
    use std::{error::Error as StdError, fmt};

    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    #[derive(Debug)]
    struct FakeDbError {
        unique: bool,
    }

    impl fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message())
        }
    }

    impl StdError for FakeDbError {}

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "fake database error"
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            if self.unique {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::Other
            }
        }
    }

    #[test]
    fn duplicate_email_insert_is_a_conflict() {
        let err = sqlx::Error::Database(Box::new(FakeDbError { unique: true }));
        assert!(matches!(registration_conflict(err), AppError::UserAlreadyExists));

        let err = sqlx::Error::Database(Box::new(FakeDbError { unique: false }));
        assert!(matches!(registration_conflict(err), AppError::DatabaseError(_)));

        assert!(matches!(
            registration_conflict(sqlx::Error::RowNotFound),
            AppError::DatabaseError(_)
        ));
    }

    #[test]
    fn emails_are_compared_case_insensitively() {
        assert_eq!(normalize_email("  Maria@Example.COM "), "maria@example.com");
    }
}
