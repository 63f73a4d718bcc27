use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single OpenWeather request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The icon code cannot be placed into an icon URL.
    #[error("invalid icon code '{0}'")]
    InvalidIcon(String),

    /// The request URL is stripped from `source`; it carries the API key.
    #[error("request to {endpoint} failed")]
    Network {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} request failed with status {status}: {message}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
        message: String,
    },

    #[error("failed to decode {endpoint} response")]
    Decoding {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("icon response for '{0}' is not a PNG image")]
    NotAnImage(String),
}

impl ApiError {
    /// HTTP status of the failed request, when the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Network { source, .. } => source.status(),
            _ => None,
        }
    }
}
