//! Long-running notifier: keeps the tracker snapshot current and polls SOC
//! for open sections until interrupted.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use course_tracker::config::Config;
use course_tracker::db::TrackerDb;
use course_tracker::dispatcher::Dispatcher;
use course_tracker::logging;
use course_tracker::poller::AvailabilityPoller;
use course_tracker::push::{FcmClient, PushSender};
use course_tracker::snapshot::TrackerSnapshot;
use course_tracker::soc::SocClient;
use course_tracker::term::PrimarySeason;
use course_tracker::watcher::TrackerWatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let config = Config::from_env().context("loading config")?;

    let primary = PrimarySeason::from_file(&config.season_file)?;
    let seasons = primary.tracked_seasons().to_vec();
    info!(primary = ?primary, seasons = ?seasons, "Read primary season");

    let db = Arc::new(TrackerDb::open(&config.db_path).context("opening tracker store")?);
    let soc = Arc::new(SocClient::new(config.soc.clone())?);
    let push: Arc<dyn PushSender> = Arc::new(FcmClient::from_config(&config.push)?);

    let snapshot = Arc::new(TrackerSnapshot::new());
    let watcher = Arc::new(TrackerWatcher::new(
        db.clone(),
        snapshot.clone(),
        config.feed_probe_interval(),
    ));
    watcher.populate().context("loading active trackers")?;
    let watch_handle = watcher.start();

    let dispatcher = Arc::new(Dispatcher::new(db, push));
    let poller = Arc::new(AvailabilityPoller::new(
        soc,
        snapshot,
        dispatcher,
        seasons,
        config.poller_settings(),
    ));
    let poll_handle = poller.start();

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    poll_handle.abort();
    watch_handle.abort();
    Ok(())
}
