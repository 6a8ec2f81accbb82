use thiserror::Error;

/// Errors from the push delivery service.
#[derive(Debug, Error, Clone)]
pub enum PushError {
    #[error("Network error: {message}")]
    Network { message: String },

    /// The provider refused the message
    #[error("Push rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    #[error("Push is not configured: {message}")]
    NotConfigured { message: String },
}

impl PushError {
    /// Returns true if sending the same message later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PushError::Network { .. } | PushError::UnexpectedResponse { .. } => true,
            PushError::Rejected { status, .. } => *status >= 500 || *status == 429,
            PushError::NotConfigured { .. } => false,
        }
    }
}

impl From<reqwest::Error> for PushError {
    fn from(err: reqwest::Error) -> Self {
        PushError::Network {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for PushError {
    fn from(err: url::ParseError) -> Self {
        PushError::NotConfigured {
            message: err.to_string(),
        }
    }
}
