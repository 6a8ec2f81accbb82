//! Keeps the tracker snapshot in step with the store.
//!
//! Two signals trigger a re-read of the active trackers: the store's own
//! change generation (writes made through our handle, such as deactivations)
//! and a change in SQLite's `data_version` (commits from other processes).

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::db::{DbError, TrackerDb};
use crate::snapshot::{SnapshotUpdate, TrackerSnapshot};

pub struct TrackerWatcher {
    db: Arc<TrackerDb>,
    snapshot: Arc<TrackerSnapshot>,
    probe_interval: Duration,
}

impl TrackerWatcher {
    pub fn new(db: Arc<TrackerDb>, snapshot: Arc<TrackerSnapshot>, probe_interval: Duration) -> Self {
        Self {
            db,
            snapshot,
            probe_interval,
        }
    }

    /// Loads the initial snapshot. Failing here is a startup failure.
    pub fn populate(&self) -> Result<usize, DbError> {
        let trackers = self.db.active_trackers()?;
        let count = trackers.len();
        self.snapshot.offer(trackers);
        info!(active = count, "Populated tracker snapshot");
        Ok(count)
    }

    /// Re-reads active trackers and offers them to the snapshot. Errors are logged only.
    pub fn refresh(&self) -> Option<SnapshotUpdate> {
        match self.db.active_trackers() {
            Ok(trackers) => {
                let count = trackers.len();
                let update = self.snapshot.offer(trackers);
                debug!(active = count, ?update, "Tracker change received");
                Some(update)
            }
            Err(e) => {
                warn!(error = %e, "Could not read active trackers, keeping previous snapshot");
                None
            }
        }
    }

    /// Spawns the watch loop. It runs until the process exits.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.watch().await })
    }

    async fn watch(&self) {
        let mut changes = self.db.subscribe();
        let mut probe = tokio::time::interval(self.probe_interval);
        probe.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_version = self.db.data_version().ok();

        info!(probe_interval = ?self.probe_interval, "Watching trackers for changes");

        loop {
            tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        // The store handle is gone, nothing left to watch
                        break;
                    }
                    self.refresh();
                }
                _ = probe.tick() => {
                    match self.db.data_version() {
                        Ok(version) if Some(version) != last_version => {
                            last_version = Some(version);
                            self.refresh();
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "Could not probe tracker store"),
                    }
                }
            }
        }
    }
}
