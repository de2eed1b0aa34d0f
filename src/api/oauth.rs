use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use rand::{Rng, distr::Alphanumeric};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::auth::{find_user_by_email, normalize_email},
    errors::AppError,
    middleware::gate::{CALLBACK_PATH, COMPLETE_PROFILE_PATH, DASHBOARD_PATH},
    models::{app_state::AppState, user::User},
    utils::{
        cookies::{OAUTH_STATE_COOKIE, clear_cookie, oauth_state_cookie, read_cookie, session_cookie},
        jwt::issue_session,
        oauth::{OAuthIdentity, OAuthProvider},
    },
};

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

fn redirect_uri(state: &AppState) -> String {
    format!("{}{}", state.config.public_url, CALLBACK_PATH)
}

/// Start OAuth sign-in
#[utoipa::path(
    get,
    path = "/api/v1/auth/oauth/{provider}",
    params(("provider" = String, Path, description = "`google` or `github`")),
    responses(
        (status = 307, description = "Redirect to the provider's consent page"),
        (status = 400, description = "Unknown provider"),
        (status = 502, description = "Provider not configured")
    ),
    tag = "Authentication"
)]
pub async fn oauth_start(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Response, AppError> {
    let provider: OAuthProvider = provider
        .parse()
        .map_err(|_| AppError::ValidationError(format!("Unknown OAuth provider: {provider}")))?;
    let client = provider.client(&state.config.oauth)?;

    let csrf: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();

    let url = provider.authorize_url(client, &redirect_uri(&state), &csrf);
    let cookie = oauth_state_cookie(
        &format!("{provider}.{csrf}"),
        state.config.session.cookie_secure,
    );

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::temporary(&url),
    )
        .into_response())
}

/// OAuth provider callback. Always ends in a redirect: `/complete-profile` for
/// users without a profile, `/dashboard` otherwise, `/` on any failure.
pub async fn oauth_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let clear_state = (header::SET_COOKIE, clear_cookie(OAUTH_STATE_COOKIE));

    let Some(code) = query.code.as_deref() else {
        return (AppendHeaders([clear_state]), Redirect::temporary("/")).into_response();
    };

    match complete_sign_in(&state, &headers, code, query.state.as_deref()).await {
        Ok((session, target)) => (
            AppendHeaders([clear_state, (header::SET_COOKIE, session)]),
            Redirect::temporary(target),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("OAuth sign-in failed: {:?}", e);
            (AppendHeaders([clear_state]), Redirect::temporary("/")).into_response()
        }
    }
}

async fn complete_sign_in(
    state: &AppState,
    headers: &HeaderMap,
    code: &str,
    returned_state: Option<&str>,
) -> Result<(String, &'static str), AppError> {
    let stored = read_cookie(headers, OAUTH_STATE_COOKIE).ok_or(AppError::InvalidToken)?;
    let (provider, csrf) = stored.split_once('.').ok_or(AppError::InvalidToken)?;
    if returned_state != Some(csrf) {
        return Err(AppError::InvalidToken);
    }
    let provider: OAuthProvider = provider.parse().map_err(|_| AppError::InvalidToken)?;
    let client = provider.client(&state.config.oauth)?;

    let identity = provider
        .exchange(&state.http, client, &redirect_uri(state), code)
        .await?;
    let user_id = upsert_oauth_user(state, &identity).await?;

    let has_profile = sqlx::query_scalar::<_, Uuid>("SELECT id FROM profiles WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .is_some();

    let session = issue_session(user_id, &state.config.session)?;
    let cookie = session_cookie(&session.token, session.expires_in, &state.config.session);

    tracing::info!("User {} signed in with {}", user_id, provider);

    let target = if has_profile {
        DASHBOARD_PATH
    } else {
        COMPLETE_PROFILE_PATH
    };
    Ok((cookie, target))
}

/// What a provider sign-in does to the account stored under its email
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccountLink {
    /// No account yet: create a verified one without a password
    Create,
    /// Verified account: sign straight in
    SignIn(Uuid),
    /// Unverified account: mark it verified, drop its password and pending codes
    Claim(Uuid),
}

fn account_link(existing: Option<&User>) -> AccountLink {
    match existing {
        None => AccountLink::Create,
        Some(user) if user.is_verified => AccountLink::SignIn(user.id),
        Some(user) => AccountLink::Claim(user.id),
    }
}

/// Find the account for a provider identity, creating a verified one if needed
async fn upsert_oauth_user(state: &AppState, identity: &OAuthIdentity) -> Result<Uuid, AppError> {
    let email = normalize_email(&identity.email);
    let existing = find_user_by_email(state, &email).await?;

    match account_link(existing.as_ref()) {
        AccountLink::SignIn(user_id) => Ok(user_id),
        AccountLink::Claim(user_id) => {
            claim_unverified_user(state, user_id).await?;
            tracing::info!("Unverified user {} claimed through OAuth", user_id);
            Ok(user_id)
        }
        AccountLink::Create => {
            let user_id = sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO users (email, name, is_verified)
                VALUES ($1, $2, true)
                RETURNING id
                "#,
            )
            .bind(&email)
            .bind(&identity.name)
            .fetch_one(&state.db)
            .await?;

            Ok(user_id)
        }
    }
}

async fn claim_unverified_user(state: &AppState, user_id: Uuid) -> Result<(), AppError> {
    let mut tx = state.db.begin().await?;

    sqlx::query(
        r#"
        UPDATE users
        SET is_verified = true, password_hash = NULL, updated_at = NOW()
        WHERE id = $1 AND is_verified = false
        "#,
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE otp_codes SET is_used = true WHERE user_id = $1 AND is_used = false")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}
