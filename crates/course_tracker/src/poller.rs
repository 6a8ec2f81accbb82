//! The availability poll loop.
//!
//! Every interval, each tracked season is resolved to a term, SOC is asked
//! which sections are open, and every active tracker for that season whose
//! index is open is handed to the [`Dispatcher`]. A failing term is logged
//! and skipped; the loop itself never stops.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDateTime, NaiveTime, Timelike};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::db::Tracker;
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::snapshot::TrackerSnapshot;
use crate::soc::SocClient;
use crate::term::{Season, Term};

/// Local wall-clock window during which SOC does not update. Both ends are
/// inclusive at minute granularity; `start > end` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl QuietHours {
    pub fn contains(&self, time: NaiveTime) -> bool {
        let time = NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time);
        if self.start <= self.end {
            self.start <= time && time <= self.end
        } else {
            time >= self.start || time <= self.end
        }
    }
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(2, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(6, 30, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub interval: Duration,
    pub dispatch_concurrency: usize,
    pub quiet_hours: Option<QuietHours>,
}

/// Counters for one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Cycle fell inside the quiet window and did nothing
    pub skipped: bool,
    pub terms_polled: usize,
    pub terms_failed: usize,
    pub matched: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct AvailabilityPoller {
    soc: Arc<SocClient>,
    snapshot: Arc<TrackerSnapshot>,
    dispatcher: Arc<Dispatcher>,
    seasons: Vec<Season>,
    settings: PollerSettings,
}

impl AvailabilityPoller {
    pub fn new(
        soc: Arc<SocClient>,
        snapshot: Arc<TrackerSnapshot>,
        dispatcher: Arc<Dispatcher>,
        seasons: Vec<Season>,
        settings: PollerSettings,
    ) -> Self {
        info!(
            seasons = ?seasons,
            interval = ?settings.interval,
            "Initializing availability poller"
        );
        Self {
            soc,
            snapshot,
            dispatcher,
            seasons,
            settings,
        }
    }

    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Polls forever on the configured interval.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.settings.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Starting availability poll loop");

        loop {
            interval.tick().await;
            self.run_cycle(Local::now().naive_local()).await;
        }
    }

    /// Runs one reconciliation pass as if the local time were `now`.
    pub async fn run_cycle(&self, now: NaiveDateTime) -> CycleReport {
        if let Some(quiet) = &self.settings.quiet_hours {
            if quiet.contains(now.time()) {
                debug!(time = %now.time(), "Inside SOC quiet window, skipping cycle");
                return CycleReport {
                    skipped: true,
                    ..CycleReport::default()
                };
            }
        }

        let mut report = CycleReport::default();
        let guard = self.snapshot.begin_reconcile();
        let trackers = guard.trackers();
        self.dispatcher.prune(trackers);
        self.dispatcher.retry_pending();
        debug!(active = trackers.len(), "Started poll cycle");

        for season in &self.seasons {
            let term = Term::resolve(*season, now.year());
            self.poll_term(term, trackers, &mut report).await;
        }
        drop(guard);

        info!(
            terms_polled = report.terms_polled,
            terms_failed = report.terms_failed,
            matched = report.matched,
            sent = report.sent,
            failed = report.failed,
            "Finished poll cycle"
        );
        report
    }

    async fn poll_term(&self, term: Term, trackers: &[Tracker], report: &mut CycleReport) {
        let open = match self.soc.open_sections(term).await {
            Ok(open) => open,
            Err(e) => {
                warn!(
                    term = %term,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Could not fetch open sections, skipping term"
                );
                report.terms_failed += 1;
                return;
            }
        };
        report.terms_polled += 1;

        let matches: Vec<Tracker> = trackers
            .iter()
            .filter(|t| t.watches(&term) && open.contains(&t.index))
            .cloned()
            .collect();
        report.matched += matches.len();

        let outcomes: Vec<DispatchOutcome> = stream::iter(matches)
            .map(|tracker| {
                let dispatcher = self.dispatcher.clone();
                async move { dispatcher.dispatch(&tracker, term).await }
            })
            .buffer_unordered(self.settings.dispatch_concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                DispatchOutcome::Sent { .. } | DispatchOutcome::SentPendingDeactivation { .. } => {
                    report.sent += 1
                }
                DispatchOutcome::AlreadyDelivered => {}
                DispatchOutcome::NoToken
                | DispatchOutcome::StoreUnavailable
                | DispatchOutcome::SendFailed => report.failed += 1,
            }
        }
    }
}
