#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use course_tracker::db::{DbUser, NewTracker, TrackerDb};
use course_tracker::push::{PushError, PushMessage, PushSender};
use course_tracker::soc::{SocClient, SocConfig};
use course_tracker::term::Season;

/// Push sender that records messages instead of sending them.
#[derive(Default)]
pub struct RecordingPush {
    pub fail: AtomicBool,
    pub sent: Mutex<Vec<PushMessage>>,
}

impl RecordingPush {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushSender for RecordingPush {
    async fn send(&self, message: &PushMessage) -> Result<String, PushError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PushError::Rejected {
                status: 503,
                message: "UNAVAILABLE".to_string(),
            });
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(format!("projects/test/messages/{}", sent.len()))
    }
}

pub fn soc_client(base_url: &str) -> Arc<SocClient> {
    let config = SocConfig::default().with_base_url(base_url).unwrap();
    Arc::new(SocClient::new(config).unwrap())
}

pub fn memory_db() -> Arc<TrackerDb> {
    Arc::new(TrackerDb::open(":memory:").unwrap())
}

pub fn add_user(db: &TrackerDb, user: &str, token: &str) {
    db.upsert_user(&DbUser {
        user: user.to_string(),
        r_token: token.to_string(),
    })
    .unwrap();
}

pub fn add_tracker(db: &TrackerDb, user: &str, index: &str, semester: Season) -> i64 {
    db.insert_tracker(&NewTracker {
        user: user.to_string(),
        subject: "198".to_string(),
        course_number: "111".to_string(),
        course: "INTRO COMPUTER SCI".to_string(),
        index: index.to_string(),
        semester,
        created_at: Utc::now(),
    })
    .unwrap()
}
