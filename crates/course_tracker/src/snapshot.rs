//! In-memory snapshot of active trackers shared by the watcher and the poller.
//!
//! The watcher replaces the snapshot wholesale. While the poller holds a
//! [`ReconcileGuard`] the replacement is parked instead (latest wins) and
//! promoted when the guard drops, so the watcher never waits on a pass and
//! the poller always iterates a stable set.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::db::Tracker;

/// What happened to a set offered by the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotUpdate {
    Replaced,
    Deferred,
}

#[derive(Default)]
struct State {
    current: Arc<Vec<Tracker>>,
    deferred: Option<Arc<Vec<Tracker>>>,
    reconciling: bool,
}

#[derive(Default)]
pub struct TrackerSnapshot {
    state: Mutex<State>,
}

impl TrackerSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Offers a fresh set of active trackers.
    pub fn offer(&self, trackers: Vec<Tracker>) -> SnapshotUpdate {
        let trackers = Arc::new(trackers);
        let mut state = self.state();
        if state.reconciling {
            state.deferred = Some(trackers);
            SnapshotUpdate::Deferred
        } else {
            state.current = trackers;
            SnapshotUpdate::Replaced
        }
    }

    /// The set the next pass would see.
    pub fn current(&self) -> Arc<Vec<Tracker>> {
        self.state().current.clone()
    }

    pub fn is_reconciling(&self) -> bool {
        self.state().reconciling
    }

    /// Starts a reconciliation pass over the current set.
    pub fn begin_reconcile(&self) -> ReconcileGuard<'_> {
        let mut state = self.state();
        state.reconciling = true;
        ReconcileGuard {
            trackers: state.current.clone(),
            snapshot: self,
        }
    }

    fn end_reconcile(&self) {
        let mut state = self.state();
        state.reconciling = false;
        if let Some(deferred) = state.deferred.take() {
            state.current = deferred;
        }
    }
}

/// Holds the snapshot steady for one pass. Dropping it ends the pass.
pub struct ReconcileGuard<'a> {
    trackers: Arc<Vec<Tracker>>,
    snapshot: &'a TrackerSnapshot,
}

impl ReconcileGuard<'_> {
    pub fn trackers(&self) -> &[Tracker] {
        &self.trackers
    }
}

impl Drop for ReconcileGuard<'_> {
    fn drop(&mut self) {
        self.snapshot.end_reconcile();
    }
}
