use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::SessionConfig,
    errors::AppError,
    utils::cookies::{bearer_token, read_cookie},
};

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub exp: i64,
    pub iat: i64,
}

/// A freshly signed session token
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_in: i64,
}

/// Sign a session token for `user_id`
pub fn issue_session(user_id: Uuid, config: &SessionConfig) -> Result<IssuedSession, AppError> {
    let now = Utc::now();
    let expires_in = config.expiry_hours * 3600;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + Duration::seconds(expires_in)).timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalError(format!("Failed to generate token: {}", e)))?;

    Ok(IssuedSession { token, expires_in })
}

/// Verify a session token and return the user it belongs to
pub fn session_user(token: &str, secret: &str) -> Result<Uuid, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })?;

    Uuid::parse_str(&token_data.claims.sub).map_err(|_| AppError::InvalidToken)
}

/// User behind a request's session. A bearer token is tried first; when it is
/// missing or does not verify, the session cookie is tried.
pub fn request_user(headers: &HeaderMap, config: &SessionConfig) -> Result<Uuid, AppError> {
    let bearer = bearer_token(headers).map(|token| session_user(token, &config.jwt_secret));
    if let Some(Ok(user_id)) = bearer {
        return Ok(user_id);
    }

    match read_cookie(headers, &config.cookie_name) {
        Some(token) => session_user(token, &config.jwt_secret),
        None => bearer.unwrap_or(Err(AppError::Unauthorized)),
    }
}
