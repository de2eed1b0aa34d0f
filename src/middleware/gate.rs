//! Page gate: keeps signed-out visitors out of the dashboard and sends
//! signed-in users with an unfinished profile to `/complete-profile`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use uuid::Uuid;

use crate::{
    errors::AppError,
    models::{
        app_state::AppState,
        profile::{Profile, profile_complete},
    },
    utils::jwt::request_user,
};

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const COMPLETE_PROFILE_PATH: &str = "/complete-profile";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const CALLBACK_PATH: &str = "/auth/callback";

/// Paths the gate never looks at
const UNGATED_PREFIXES: &[&str] = &["/api", "/static", "/favicon.ico"];

/// What the gate knows about the visitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visitor {
    Anonymous,
    SignedIn { profile_complete: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    Redirect(&'static str),
}

pub fn is_gated(path: &str) -> bool {
    !UNGATED_PREFIXES.iter().any(|prefix| {
        path == *prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

pub fn decide(path: &str, visitor: Visitor) -> GateDecision {
    if path == CALLBACK_PATH {
        return GateDecision::Pass;
    }

    match visitor {
        Visitor::SignedIn {
            profile_complete: false,
        } if path != COMPLETE_PROFILE_PATH => GateDecision::Redirect(COMPLETE_PROFILE_PATH),
        Visitor::SignedIn {
            profile_complete: true,
        } if matches!(path, LOGIN_PATH | REGISTER_PATH | COMPLETE_PROFILE_PATH) => {
            GateDecision::Redirect(DASHBOARD_PATH)
        }
        Visitor::Anonymous
            if path.starts_with(DASHBOARD_PATH) || path == COMPLETE_PROFILE_PATH =>
        {
            GateDecision::Redirect(LOGIN_PATH)
        }
        _ => GateDecision::Pass,
    }
}

async fn lookup_visitor(state: &AppState, user_id: Uuid) -> Result<Visitor, AppError> {
    let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?;

    Ok(Visitor::SignedIn {
        profile_complete: profile_complete(profile.as_ref()),
    })
}

/// Applied to every route; API, static asset and favicon paths pass untouched.
pub async fn gate_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if !is_gated(&path) {
        return next.run(req).await;
    }

    let user_id = request_user(req.headers(), &state.config.session).ok();

    let visitor = match user_id {
        None => Visitor::Anonymous,
        Some(user_id) => match lookup_visitor(&state, user_id).await {
            Ok(visitor) => visitor,
            Err(e) => {
                tracing::error!("Route gate lookup failed for {}: {:?}", path, e);
                return next.run(req).await;
            }
        },
    };

    match decide(&path, visitor) {
        GateDecision::Pass => next.run(req).await,
        GateDecision::Redirect(target) => {
            tracing::debug!("Gate redirect {} -> {}", path, target);
            Redirect::temporary(target).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INCOMPLETE: Visitor = Visitor::SignedIn {
        profile_complete: false,
    };
    const COMPLETE: Visitor = Visitor::SignedIn {
        profile_complete: true,
    };

    #[test]
    fn api_and_assets_are_not_gated() {
        assert!(!is_gated("/api"));
        assert!(!is_gated("/api/v1/incidents"));
        assert!(!is_gated("/static/app.js"));
        assert!(!is_gated("/favicon.ico"));
        assert!(is_gated("/"));
        assert!(is_gated("/dashboard"));
        assert!(is_gated("/apiary"));
    }

    #[test]
    fn callback_always_passes() {
        for visitor in [Visitor::Anonymous, INCOMPLETE, COMPLETE] {
            assert_eq!(decide(CALLBACK_PATH, visitor), GateDecision::Pass);
        }
    }

    #[test]
    fn anonymous_visitors_are_kept_out_of_the_dashboard() {
        for path in ["/dashboard", "/dashboard/incidents", "/complete-profile"] {
            assert_eq!(
                decide(path, Visitor::Anonymous),
                GateDecision::Redirect(LOGIN_PATH),
                "{path}"
            );
        }
        for path in ["/", "/login", "/register", "/pricing", "/verify-email"] {
            assert_eq!(decide(path, Visitor::Anonymous), GateDecision::Pass, "{path}");
        }
    }

    #[test]
    fn incomplete_profile_is_sent_to_complete_profile_from_anywhere() {
        for path in ["/", "/login", "/register", "/dashboard", "/dashboard/my-incidents"] {
            assert_eq!(
                decide(path, INCOMPLETE),
                GateDecision::Redirect(COMPLETE_PROFILE_PATH),
                "{path}"
            );
        }
        assert_eq!(decide(COMPLETE_PROFILE_PATH, INCOMPLETE), GateDecision::Pass);
    }

    #[test]
    fn complete_profile_skips_auth_pages() {
        for path in [LOGIN_PATH, REGISTER_PATH, COMPLETE_PROFILE_PATH] {
            assert_eq!(
                decide(path, COMPLETE),
                GateDecision::Redirect(DASHBOARD_PATH),
                "{path}"
            );
        }
        for path in ["/", "/dashboard", "/dashboard/profile", "/pricing"] {
            assert_eq!(decide(path, COMPLETE), GateDecision::Pass, "{path}");
        }
    }
}
