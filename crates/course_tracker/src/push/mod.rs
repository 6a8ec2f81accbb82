//! Push notifications for opened sections.

mod error;
mod fcm;

pub use error::PushError;
pub use fcm::{FcmClient, FcmConfig};

use crate::term::Term;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

const OPEN_BODY: &str = "Tap to open WebReg";

/// Anything that can deliver a [`PushMessage`] and report the provider's message id.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<String, PushError>;
}

/// A push message in the shape the FCM HTTP v1 API expects under `message`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub token: String,
    pub data: BTreeMap<String, String>,
    pub notification: Notification,
    pub android: AndroidConfig,
    pub apns: ApnsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AndroidConfig {
    pub priority: String,
    pub notification: AndroidNotification,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AndroidNotification {
    pub sound: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApnsConfig {
    pub payload: ApnsPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApnsPayload {
    pub aps: Aps,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aps {
    pub sound: String,
}

impl PushMessage {
    /// Builds the "section is now open" message for one device token.
    pub fn section_open(token: &str, course_name: &str, index: &str, term: Term) -> Self {
        let data = BTreeMap::from([
            ("index".to_string(), index.to_string()),
            ("year".to_string(), term.year.to_string()),
            ("sem".to_string(), term.season.code().to_string()),
        ]);

        Self {
            token: token.to_string(),
            data,
            notification: Notification {
                title: format!("{course_name} ({index}) is now open!"),
                body: OPEN_BODY.to_string(),
            },
            android: AndroidConfig {
                priority: "normal".to_string(),
                notification: AndroidNotification {
                    sound: "default".to_string(),
                },
            },
            apns: ApnsConfig {
                payload: ApnsPayload {
                    aps: Aps {
                        sound: "default".to_string(),
                    },
                },
            },
        }
    }
}
