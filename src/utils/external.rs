use thiserror::Error;

/// Failure talking to a third-party HTTP service (maps, OAuth providers)
#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("{service} request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Status {
        service: &'static str,
        status: String,
        message: Option<String>,
    },

    #[error("{service} is not configured")]
    NotConfigured { service: &'static str },

    #[error("{service} response missing {field}")]
    MissingField {
        service: &'static str,
        field: &'static str,
    },
}

impl ExternalError {
    pub fn http(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| ExternalError::Http { service, source }
    }
}
