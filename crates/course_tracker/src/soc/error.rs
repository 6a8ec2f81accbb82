//! Error types for Schedule of Classes requests.

use thiserror::Error;

/// Errors that can occur while talking to the Schedule of Classes API.
#[derive(Debug, Error, Clone)]
pub enum SocError {
    /// Network/HTTP request failed, including timeouts
    #[error("Network error: {message}")]
    Network { message: String },

    /// Server answered with a non-success status
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// Body was not the JSON shape we expected
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// URL construction failed
    #[error("URL error: {message}")]
    Url { message: String },
}

impl SocError {
    /// Returns true if the failure is transient and the next cycle may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SocError::Network { .. } | SocError::Parse { .. } => true,
            SocError::Status { status, .. } => *status >= 500 || *status == 429,
            SocError::Url { .. } => false,
        }
    }
}

impl From<reqwest::Error> for SocError {
    fn from(err: reqwest::Error) -> Self {
        SocError::Network {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SocError {
    fn from(err: serde_json::Error) -> Self {
        SocError::Parse {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for SocError {
    fn from(err: url::ParseError) -> Self {
        SocError::Url {
            message: err.to_string(),
        }
    }
}
