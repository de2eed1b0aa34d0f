use axum::http::{HeaderMap, header};

use crate::config::SessionConfig;

pub const OAUTH_STATE_COOKIE: &str = "smartcity_oauth_state";
const OAUTH_STATE_MAX_AGE: i64 = 600;

/// `Set-Cookie` value carrying the session token
pub fn session_cookie(token: &str, max_age: i64, config: &SessionConfig) -> String {
    build_cookie(&config.cookie_name, token, max_age, config.cookie_secure)
}

/// `Set-Cookie` value for the short-lived OAuth state
pub fn oauth_state_cookie(value: &str, secure: bool) -> String {
    build_cookie(OAUTH_STATE_COOKIE, value, OAUTH_STATE_MAX_AGE, secure)
}

/// `Set-Cookie` value that removes `name`
pub fn clear_cookie(name: &str) -> String {
    format!("{}=; Path=/; Max-Age=0; SameSite=Lax; HttpOnly", name)
}

fn build_cookie(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Lax; HttpOnly{}",
        name, value, max_age, secure
    )
}

/// Value of cookie `name` from the request's `Cookie` headers
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Token carried in `Authorization: Bearer`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn reads_named_cookie_among_others() {
        let map = headers(&[(header::COOKIE, "theme=dark; smartcity_session=abc.def; lang=es")]);
        assert_eq!(read_cookie(&map, "smartcity_session"), Some("abc.def"));
        assert_eq!(read_cookie(&map, "missing"), None);
    }

    #[test]
    fn reads_across_multiple_cookie_headers() {
        let map = headers(&[
            (header::COOKIE, "theme=dark"),
            (header::COOKIE, "smartcity_session=tok"),
        ]);
        assert_eq!(read_cookie(&map, "smartcity_session"), Some("tok"));
    }

    #[test]
    fn empty_cookie_counts_as_absent() {
        let map = headers(&[(header::COOKIE, "smartcity_session=")]);
        assert_eq!(read_cookie(&map, "smartcity_session"), None);
    }

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        let map = headers(&[(header::AUTHORIZATION, "Bearer abc.def")]);
        assert_eq!(bearer_token(&map), Some("abc.def"));

        let map = headers(&[(header::AUTHORIZATION, "Bearer   ")]);
        assert_eq!(bearer_token(&map), None);

        let map = headers(&[(header::AUTHORIZATION, "Basic abc")]);
        assert_eq!(bearer_token(&map), None);
    }

    #[test]
    fn session_cookie_attributes() {
        let config = SessionConfig {
            jwt_secret: "s".to_string(),
            expiry_hours: 24,
            cookie_name: "smartcity_session".to_string(),
            cookie_secure: true,
        };
        let cookie = session_cookie("tok", 86400, &config);
        assert_eq!(
            cookie,
            "smartcity_session=tok; Path=/; Max-Age=86400; SameSite=Lax; HttpOnly; Secure"
        );
        assert!(clear_cookie("smartcity_session").contains("Max-Age=0"));
    }
}
