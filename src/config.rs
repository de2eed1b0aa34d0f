use std::{fmt::Display, str::FromStr};

use shuttle_runtime::SecretStore;

use crate::errors::AppError;

const DEFAULT_PLACES_URL: &str = "https://maps.googleapis.com/maps/api/place";

/// Runtime configuration, read from the deployment's secret store
#[derive(Debug, Clone)]
pub struct Config {
    pub public_url: String,
    pub frontend_dir: String,
    pub allow_origins: Vec<String>,
    pub session: SessionConfig,
    pub email: EmailConfig,
    pub maps: MapsConfig,
    pub oauth: OAuthConfig,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub jwt_secret: String,
    pub expiry_hours: i64,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Without a key, verification codes are written to the log instead of mailed.
    pub resend_api_key: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct MapsConfig {
    pub api_key: Option<String>,
    pub browser_key: Option<String>,
    pub places_url: String,
    pub country: String,
}

#[derive(Debug, Clone, Default)]
pub struct OAuthConfig {
    pub google: Option<OAuthClientConfig>,
    pub github: Option<OAuthClientConfig>,
}

#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
}

impl Config {
    pub fn from_secrets(secrets: &SecretStore) -> Result<Self, AppError> {
        Self::from_lookup(|key| secrets.get(key))
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = var("JWT_SECRET")
            .ok_or_else(|| AppError::InternalError("JWT_SECRET is not set".to_string()))?;

        let oauth_client = |prefix: &str| {
            let id = var(&format!("{prefix}_CLIENT_ID"))?;
            let secret = var(&format!("{prefix}_CLIENT_SECRET"))?;
            Some(OAuthClientConfig {
                client_id: id,
                client_secret: secret,
            })
        };

        Ok(Self {
            public_url: var("PUBLIC_URL")
                .unwrap_or_else(|| "http://localhost:8000".to_string())
                .trim_end_matches('/')
                .to_string(),
            frontend_dir: var("FRONTEND_DIR").unwrap_or_else(|| "frontend".to_string()),
            allow_origins: var("ALLOW_ORIGINS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_default(),
            session: SessionConfig {
                jwt_secret,
                expiry_hours: parse_or(var("JWT_EXPIRY_HOURS"), "JWT_EXPIRY_HOURS", 24)?,
                cookie_name: var("SESSION_COOKIE")
                    .unwrap_or_else(|| "smartcity_session".to_string()),
                cookie_secure: parse_or(var("COOKIE_SECURE"), "COOKIE_SECURE", true)?,
            },
            email: EmailConfig {
                resend_api_key: var("RESEND_API_KEY"),
                from: var("EMAIL_FROM")
                    .unwrap_or_else(|| "SmartCity <onboarding@resend.dev>".to_string()),
            },
            maps: MapsConfig {
                api_key: var("GOOGLE_MAPS_API_KEY"),
                browser_key: var("GOOGLE_MAPS_BROWSER_KEY"),
                places_url: var("GOOGLE_PLACES_URL")
                    .unwrap_or_else(|| DEFAULT_PLACES_URL.to_string()),
                country: var("MAPS_COUNTRY").unwrap_or_else(|| "co".to_string()),
            },
            oauth: OAuthConfig {
                google: oauth_client("GOOGLE_OAUTH"),
                github: oauth_client("GITHUB_OAUTH"),
            },
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::InternalError(format!("Invalid {key} value: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();

        assert_eq!(config.session.expiry_hours, 24);
        assert_eq!(config.session.cookie_name, "smartcity_session");
        assert!(config.session.cookie_secure);
        assert_eq!(config.maps.country, "co");
        assert_eq!(config.maps.places_url, DEFAULT_PLACES_URL);
        assert!(config.maps.api_key.is_none());
        assert!(config.email.resend_api_key.is_none());
        assert!(config.oauth.google.is_none());
        assert!(config.allow_origins.is_empty());
    }

    #[test]
    fn missing_jwt_secret_is_an_error() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("JWT_SECRET", "  ")])).is_err());
    }

    #[test]
    fn oauth_client_needs_both_id_and_secret() {
        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("GOOGLE_OAUTH_CLIENT_ID", "id"),
            ("GITHUB_OAUTH_CLIENT_ID", "gh-id"),
            ("GITHUB_OAUTH_CLIENT_SECRET", "gh-secret"),
        ]))
        .unwrap();

        assert!(config.oauth.google.is_none());
        let github = config.oauth.github.unwrap();
        assert_eq!(github.client_id, "gh-id");
        assert_eq!(github.client_secret, "gh-secret");
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let result = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("JWT_EXPIRY_HOURS", "forever"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn origins_and_public_url_are_normalised() {
        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("PUBLIC_URL", "https://smartcity.example/"),
            ("ALLOW_ORIGINS", "https://a.example, https://b.example"),
        ]))
        .unwrap();

        assert_eq!(config.public_url, "https://smartcity.example");
        assert_eq!(
            config.allow_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }
}
