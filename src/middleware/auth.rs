use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    errors::AppError,
    models::app_state::AppState,
    utils::jwt::request_user,
};

/// Require a valid session (Bearer token or session cookie) and expose the
/// user id to handlers as an `Extension<Uuid>`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = request_user(req.headers(), &state.config.session)?;

    req.extensions_mut().insert(user_id);

    Ok(next.run(req).await)
}
