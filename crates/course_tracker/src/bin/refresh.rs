//! One-shot catalog refresh for every tracked term.

use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{Datelike, Local};
use tracing::info;

use course_tracker::catalog::CatalogRefresher;
use course_tracker::config::Config;
use course_tracker::db::TrackerDb;
use course_tracker::logging;
use course_tracker::soc::SocClient;
use course_tracker::term::PrimarySeason;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let config = Config::from_env().context("loading config")?;

    let primary = PrimarySeason::from_file(&config.season_file)?;
    let terms = primary.tracked_terms(Local::now().year());
    info!(terms = ?terms, "Refreshing catalog");

    let db = Arc::new(TrackerDb::open(&config.db_path).context("opening tracker store")?);
    let soc = Arc::new(SocClient::new(config.soc.clone())?);
    let refresher = CatalogRefresher::new(soc, db, config.refresh_concurrency);

    let report = refresher.refresh_all(&terms).await;
    for (term, summary) in &report.refreshed {
        info!(
            term = %term,
            sections = summary.sections,
            skipped = summary.sections_skipped,
            subjects_failed = summary.subjects_failed,
            "Refreshed term"
        );
    }

    if report.refreshed.is_empty() && !report.failed.is_empty() {
        bail!("catalog refresh failed for every term");
    }
    Ok(())
}
