use std::{fmt, str::FromStr};

use serde::Deserialize;
use url::form_urlencoded;

use crate::{
    config::{OAuthClientConfig, OAuthConfig},
    utils::external::ExternalError,
};

/// Supported third-party sign-in providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    GitHub,
}

/// Identity returned by a provider after a successful code exchange
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthIdentity {
    pub email: String,
    pub name: String,
}

impl FromStr for OAuthProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(OAuthProvider::Google),
            "github" => Ok(OAuthProvider::GitHub),
            _ => Err(()),
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OAuthProvider::Google => "google",
            OAuthProvider::GitHub => "github",
        })
    }
}

impl OAuthProvider {
    fn service(self) -> &'static str {
        match self {
            OAuthProvider::Google => "google oauth",
            OAuthProvider::GitHub => "github oauth",
        }
    }

    fn authorize_endpoint(self) -> &'static str {
        match self {
            OAuthProvider::Google => "https://accounts.google.com/o/oauth2/v2/auth",
            OAuthProvider::GitHub => "https://github.com/login/oauth/authorize",
        }
    }

    fn token_endpoint(self) -> &'static str {
        match self {
            OAuthProvider::Google => "https://oauth2.googleapis.com/token",
            OAuthProvider::GitHub => "https://github.com/login/oauth/access_token",
        }
    }

    fn scope(self) -> &'static str {
        match self {
            OAuthProvider::Google => "openid email profile",
            OAuthProvider::GitHub => "read:user user:email",
        }
    }

    pub fn client(self, config: &OAuthConfig) -> Result<&OAuthClientConfig, ExternalError> {
        match self {
            OAuthProvider::Google => config.google.as_ref(),
            OAuthProvider::GitHub => config.github.as_ref(),
        }
        .ok_or(ExternalError::NotConfigured {
            service: self.service(),
        })
    }

    /// Where to send the browser to start sign-in
    pub fn authorize_url(self, client: &OAuthClientConfig, redirect_uri: &str, state: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &client.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", self.scope())
            .append_pair("state", state)
            .finish();
        format!("{}?{}", self.authorize_endpoint(), query)
    }

    /// Exchange an authorization code for the signed-in user's identity
    pub async fn exchange(
        self,
        http: &reqwest::Client,
        client: &OAuthClientConfig,
        redirect_uri: &str,
        code: &str,
    ) -> Result<OAuthIdentity, ExternalError> {
        let service = self.service();
        let token: TokenBody = http
            .post(self.token_endpoint())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(ExternalError::http(service))?
            .json()
            .await
            .map_err(ExternalError::http(service))?;

        let access_token = token.access_token.ok_or_else(|| ExternalError::Status {
            service,
            status: token.error.unwrap_or_else(|| "no_token".to_string()),
            message: token.error_description,
        })?;

        match self {
            OAuthProvider::Google => google_identity(http, &access_token).await,
            OAuthProvider::GitHub => github_identity(http, &access_token).await,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

async fn google_identity(
    http: &reqwest::Client,
    access_token: &str,
) -> Result<OAuthIdentity, ExternalError> {
    let service = OAuthProvider::Google.service();
    let info: GoogleUserInfo = http
        .get("https://openidconnect.googleapis.com/v1/userinfo")
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(ExternalError::http(service))?
        .json()
        .await
        .map_err(ExternalError::http(service))?;

    google_identity_from(info)
}

fn google_identity_from(info: GoogleUserInfo) -> Result<OAuthIdentity, ExternalError> {
    let email = info
        .email
        .filter(|_| info.email_verified)
        .ok_or(ExternalError::MissingField {
            service: OAuthProvider::Google.service(),
            field: "verified email",
        })?;
    Ok(OAuthIdentity {
        name: info.name.unwrap_or_default(),
        email,
    })
}

async fn github_identity(
    http: &reqwest::Client,
    access_token: &str,
) -> Result<OAuthIdentity, ExternalError> {
    let service = OAuthProvider::GitHub.service();
    // GitHub rejects API calls without a User-Agent.
    let user: GitHubUser = http
        .get("https://api.github.com/user")
        .bearer_auth(access_token)
        .header(reqwest::header::USER_AGENT, "smartcity")
        .send()
        .await
        .map_err(ExternalError::http(service))?
        .json()
        .await
        .map_err(ExternalError::http(service))?;

    let emails: Vec<GitHubEmail> = http
        .get("https://api.github.com/user/emails")
        .bearer_auth(access_token)
        .header(reqwest::header::USER_AGENT, "smartcity")
        .send()
        .await
        .map_err(ExternalError::http(service))?
        .json()
        .await
        .map_err(ExternalError::http(service))?;

    github_identity_from(user, emails)
}

fn github_identity_from(
    user: GitHubUser,
    emails: Vec<GitHubEmail>,
) -> Result<OAuthIdentity, ExternalError> {
    let email = emails
        .into_iter()
        .filter(|e| e.verified)
        .max_by_key(|e| e.primary)
        .map(|e| e.email)
        .ok_or(ExternalError::MissingField {
            service: OAuthProvider::GitHub.service(),
            field: "verified email",
        })?;
    Ok(OAuthIdentity {
        name: user.name.unwrap_or(user.login),
        email,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OAuthClientConfig {
        OAuthClientConfig {
            client_id: "client-123".to_string(),
            client_secret: "secret".to_string(),
        }
    }

    #[test]
    fn provider_names_round_trip() {
        assert_eq!("google".parse::<OAuthProvider>(), Ok(OAuthProvider::Google));
        assert_eq!("github".parse::<OAuthProvider>(), Ok(OAuthProvider::GitHub));
        assert!("facebook".parse::<OAuthProvider>().is_err());
        assert_eq!(OAuthProvider::GitHub.to_string(), "github");
    }

    #[test]
    fn authorize_url_carries_client_redirect_and_state() {
        let url = url::Url::parse(&OAuthProvider::Google.authorize_url(
            &client(),
            "https://smartcity.example/auth/callback",
            "xyz",
        ))
        .unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert!(pairs.contains(&("client_id".into(), "client-123".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "https://smartcity.example/auth/callback".into()
        )));
        assert!(pairs.contains(&("state".into(), "xyz".into())));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
    }

    #[test]
    fn unconfigured_provider_is_an_error() {
        let config = OAuthConfig::default();
        assert!(OAuthProvider::GitHub.client(&config).is_err());
    }

    #[test]
    fn google_requires_verified_email() {
        let info: GoogleUserInfo = serde_json::from_str(
            r#"{"email": "maria@example.com", "email_verified": true, "name": "María"}"#,
        )
        .unwrap();
        assert_eq!(
            google_identity_from(info).unwrap(),
            OAuthIdentity {
                email: "maria@example.com".into(),
                name: "María".into()
            }
        );

        let unverified: GoogleUserInfo =
            serde_json::from_str(r#"{"email": "maria@example.com"}"#).unwrap();
        assert!(google_identity_from(unverified).is_err());
    }

    #[test]
    fn github_prefers_primary_verified_email() {
        let user: GitHubUser = serde_json::from_str(r#"{"login": "mgomez", "name": null}"#).unwrap();
        let emails: Vec<GitHubEmail> = serde_json::from_str(
            r#"[
                {"email": "old@example.com", "primary": false, "verified": true},
                {"email": "unverified@example.com", "primary": false, "verified": false},
                {"email": "main@example.com", "primary": true, "verified": true}
            ]"#,
        )
        .unwrap();

        let identity = github_identity_from(user, emails).unwrap();
        assert_eq!(identity.email, "main@example.com");
        assert_eq!(identity.name, "mgomez");
    }

    #[test]
    fn github_without_verified_email_fails() {
        let user: GitHubUser = serde_json::from_str(r#"{"login": "mgomez"}"#).unwrap();
        let emails: Vec<GitHubEmail> = serde_json::from_str(
            r#"[{"email": "x@example.com", "primary": true, "verified": false}]"#,
        )
        .unwrap();
        assert!(github_identity_from(user, emails).is_err());
    }
}
