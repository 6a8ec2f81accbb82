//! Catalog refresh: copies every section of the tracked terms into four
//! lookup documents per season (`sections`, `names`, `subjects`, `courses`).

mod index;

pub use index::{CatalogEntry, CatalogIndex, Projection};

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::{DbError, TrackerDb};
use crate::soc::{SocClient, SocError};
use crate::term::Term;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("could not fetch subjects: {0}")]
    Subjects(#[from] SocError),

    #[error("could not store catalog: {0}")]
    Store(#[from] DbError),
}

/// Counts for one refreshed term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermSummary {
    pub subjects: usize,
    pub subjects_failed: usize,
    pub sections: usize,
    pub sections_skipped: usize,
}

/// Outcome of a whole refresh run.
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub refreshed: Vec<(Term, TermSummary)>,
    pub failed: Vec<(Term, RefreshError)>,
}

pub struct CatalogRefresher {
    soc: Arc<SocClient>,
    db: Arc<TrackerDb>,
    concurrency: usize,
}

impl CatalogRefresher {
    pub fn new(soc: Arc<SocClient>, db: Arc<TrackerDb>, concurrency: usize) -> Self {
        Self {
            soc,
            db,
            concurrency: concurrency.max(1),
        }
    }

    /// Refreshes every term, continuing past failed ones.
    pub async fn refresh_all(&self, terms: &[Term]) -> RefreshReport {
        let start = Instant::now();
        let mut report = RefreshReport::default();

        for term in terms {
            match self.refresh_term(*term).await {
                Ok(summary) => report.refreshed.push((*term, summary)),
                Err(e) => {
                    error!(term = %term, error = %e, "Catalog refresh failed for term");
                    report.failed.push((*term, e));
                }
            }
        }

        info!(
            refreshed = report.refreshed.len(),
            failed = report.failed.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Catalog refresh finished"
        );
        report
    }

    /// Rebuilds and overwrites the catalog documents of one term.
    ///
    /// A failing subject is skipped; a failing subject list leaves the stored
    /// documents untouched.
    pub async fn refresh_term(&self, term: Term) -> Result<TermSummary, RefreshError> {
        let (index, summary) = self.build_index(term).await?;

        self.db.replace_catalog(&index.documents(term.season))?;
        info!(
            term = %term,
            sections = summary.sections,
            skipped = summary.sections_skipped,
            subjects_failed = summary.subjects_failed,
            "Wrote catalog documents"
        );
        Ok(summary)
    }

    /// Fetches subjects and their courses and flattens them into an index.
    pub async fn build_index(&self, term: Term) -> Result<(CatalogIndex, TermSummary), SocError> {
        let subjects = self.soc.subjects(term).await?;
        info!(term = %term, subjects = subjects.len(), "Fetched subject list");

        // `buffered` keeps subject order, so repeated runs build the same index
        let results: Vec<_> = stream::iter(subjects.iter())
            .map(|subject| async move {
                (subject, self.soc.courses(term, &subject.code).await)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut index = CatalogIndex::new();
        let mut summary = TermSummary {
            subjects: subjects.len(),
            ..TermSummary::default()
        };

        for (subject, result) in results {
            match result {
                Ok(courses) => {
                    for course in &courses {
                        summary.sections_skipped += index.add_course(course);
                    }
                }
                Err(e) => {
                    warn!(
                        term = %term,
                        subject = %subject.code,
                        error = %e,
                        "Could not fetch courses, skipping subject"
                    );
                    summary.subjects_failed += 1;
                }
            }
        }

        summary.sections = index.len();
        Ok((index, summary))
    }
}
