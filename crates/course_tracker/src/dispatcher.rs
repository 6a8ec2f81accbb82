//! Sends the "section open" push for a matched tracker and retires the tracker.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{error, info, warn};

use crate::db::{Tracker, TrackerDb};
use crate::push::{PushMessage, PushSender};
use crate::term::Term;

/// Result of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Push accepted and tracker deactivated
    Sent { message_id: String },
    /// Push accepted, but the deactivation write failed. Retried next cycle without resending.
    SentPendingDeactivation { message_id: String },
    /// A push was already accepted for this tracker earlier
    AlreadyDelivered,
    /// Owner has no push token on record
    NoToken,
    /// Store could not be read
    StoreUnavailable,
    /// Provider refused or could not be reached; tracker stays active
    SendFailed,
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(
            self,
            DispatchOutcome::Sent { .. } | DispatchOutcome::SentPendingDeactivation { .. }
        )
    }
}

pub struct Dispatcher {
    db: Arc<TrackerDb>,
    push: Arc<dyn PushSender>,
    /// Trackers whose push was accepted, mapped to whether deactivation is confirmed
    delivered: DashMap<i64, bool>,
}

impl Dispatcher {
    pub fn new(db: Arc<TrackerDb>, push: Arc<dyn PushSender>) -> Self {
        Self {
            db,
            push,
            delivered: DashMap::new(),
        }
    }

    /// Notifies the owner of `tracker` that its section is open in `term`.
    pub async fn dispatch(&self, tracker: &Tracker, term: Term) -> DispatchOutcome {
        if let Some(confirmed) = self.delivered.get(&tracker.id).map(|entry| *entry) {
            if !confirmed {
                self.deactivate(tracker.id);
            }
            return DispatchOutcome::AlreadyDelivered;
        }

        let token = match self.db.user_token(&tracker.user) {
            Ok(Some(token)) => token,
            Ok(None) => {
                warn!(
                    tracker = tracker.id,
                    user = %tracker.user,
                    "No push token for user, skipping"
                );
                return DispatchOutcome::NoToken;
            }
            Err(e) => {
                warn!(tracker = tracker.id, error = %e, "Could not look up push token");
                return DispatchOutcome::StoreUnavailable;
            }
        };

        let message = PushMessage::section_open(&token, &tracker.course, &tracker.index, term);
        let message_id = match self.push.send(&message).await {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    tracker = tracker.id,
                    index = %tracker.index,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Push failed, tracker stays active"
                );
                return DispatchOutcome::SendFailed;
            }
        };

        info!(
            tracker = tracker.id,
            index = %tracker.index,
            term = %term,
            message_id = %message_id,
            "Sent open-section notification"
        );

        self.delivered.insert(tracker.id, false);
        if self.deactivate(tracker.id) {
            DispatchOutcome::Sent { message_id }
        } else {
            DispatchOutcome::SentPendingDeactivation { message_id }
        }
    }

    /// Marks the tracker inactive and records the confirmation. Returns false on a store error.
    fn deactivate(&self, tracker_id: i64) -> bool {
        match self.db.deactivate_tracker(tracker_id) {
            Ok(_) => {
                self.delivered.insert(tracker_id, true);
                true
            }
            Err(e) => {
                error!(tracker = tracker_id, error = %e, "Could not deactivate tracker");
                false
            }
        }
    }

    /// Retries the deactivation of every delivered tracker not yet confirmed
    /// inactive. Returns how many are still pending.
    pub fn retry_pending(&self) -> usize {
        let pending: Vec<i64> = self
            .delivered
            .iter()
            .filter(|entry| !*entry.value())
            .map(|entry| *entry.key())
            .collect();

        let still_pending = pending.into_iter().filter(|id| !self.deactivate(*id)).count();
        if still_pending > 0 {
            warn!(pending = still_pending, "Deactivations still pending after retry");
        }
        still_pending
    }

    /// Delivered trackers whose deactivation has not been confirmed
    pub fn pending_count(&self) -> usize {
        self.delivered.iter().filter(|entry| !*entry.value()).count()
    }

    /// Forgets delivered trackers that are no longer in the active set.
    pub fn prune(&self, active: &[Tracker]) {
        let ids: HashSet<i64> = active.iter().map(|t| t.id).collect();
        self.delivered.retain(|id, _| ids.contains(id));
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.len()
    }
}
