//! Firebase Cloud Messaging HTTP v1 sender.

use super::{PushError, PushMessage, PushSender};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const FCM_BASE_URL: &str = "https://fcm.googleapis.com";

/// Configuration for the FCM sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FcmConfig {
    pub project_id: String,
    /// Full `messages:send` URL. Derived from `project_id` when unset.
    pub endpoint: Option<Url>,
    /// Environment variable holding an OAuth2 access token for the project
    pub access_token_env: String,
    /// Ask FCM to validate without delivering
    pub validate_only: bool,
    pub request_timeout_secs: u64,
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            endpoint: None,
            access_token_env: "FCM_ACCESS_TOKEN".to_string(),
            validate_only: false,
            request_timeout_secs: 10,
        }
    }
}

impl FcmConfig {
    pub fn send_url(&self) -> Result<Url, PushError> {
        if let Some(endpoint) = &self.endpoint {
            return Ok(endpoint.clone());
        }
        if self.project_id.is_empty() {
            return Err(PushError::NotConfigured {
                message: "push.project_id is empty and no push.endpoint is set".to_string(),
            });
        }
        Ok(Url::parse(&format!(
            "{FCM_BASE_URL}/v1/projects/{}/messages:send",
            self.project_id
        ))?)
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    message: &'a PushMessage,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    validate_only: bool,
}

#[derive(Deserialize)]
struct SendResponse {
    name: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

pub struct FcmClient {
    client: Client,
    send_url: Url,
    access_token: String,
    validate_only: bool,
}

impl FcmClient {
    /// Builds a sender from config, reading the access token from the environment.
    pub fn from_config(config: &FcmConfig) -> Result<Self, PushError> {
        let access_token =
            std::env::var(&config.access_token_env).map_err(|_| PushError::NotConfigured {
                message: format!("environment variable {} is not set", config.access_token_env),
            })?;
        Self::new(config, access_token)
    }

    pub fn new(config: &FcmConfig, access_token: String) -> Result<Self, PushError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PushError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            send_url: config.send_url()?,
            access_token,
            validate_only: config.validate_only,
        })
    }
}

#[async_trait]
impl PushSender for FcmClient {
    async fn send(&self, message: &PushMessage) -> Result<String, PushError> {
        let request = SendRequest {
            message,
            validate_only: self.validate_only,
        };

        let response = self
            .client
            .post(self.send_url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(err) => match err.error.status {
                    Some(code) => format!("{code}: {}", err.error.message),
                    None => err.error.message,
                },
                Err(_) => text,
            };
            warn!(status = status.as_u16(), %message, "FCM rejected message");
            return Err(PushError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let sent: SendResponse =
            serde_json::from_str(&text).map_err(|e| PushError::UnexpectedResponse {
                message: format!("could not read FCM response: {e}"),
            })?;
        debug!(message_id = %sent.name, "FCM accepted message");
        Ok(sent.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_url_from_project() {
        let config = FcmConfig {
            project_id: "course-tracker".to_string(),
            ..FcmConfig::default()
        };
        assert_eq!(
            config.send_url().unwrap().as_str(),
            "https://fcm.googleapis.com/v1/projects/course-tracker/messages:send"
        );
    }

    #[test]
    fn test_send_url_requires_project_or_endpoint() {
        let err = FcmConfig::default().send_url().unwrap_err();
        assert!(matches!(err, PushError::NotConfigured { .. }));
        assert!(!err.is_retryable());
    }
}
