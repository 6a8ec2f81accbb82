/// Database module for trackers, users and catalog documents

mod error;
mod types;

pub use error::DbError;
pub use types::{CatalogDocument, DbUser, NewTracker, Tracker};

use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

const SCHEMA_SQL: &str = include_str!("../../../../sql/init_tracker.sql");

const TRACKER_COLUMNS: &str = "tracker_id, user, subject, course_number, course, section_index,
     semester, created_at, active";

pub struct TrackerDb {
    db: Mutex<Connection>,
    /// Bumped after every tracker write made through this handle
    changes: watch::Sender<u64>,
}

impl TrackerDb {
    /// Opens (or creates) the database at `db_path` and initializes the schema.
    ///
    /// `":memory:"` opens a private in-memory database.
    pub fn open(db_path: &str) -> Result<Self, DbError> {
        if db_path != ":memory:" {
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    debug!("Creating database directory {}", parent.display());
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let conn = Connection::open(db_path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        info!("Opened tracker database at {db_path}");

        let (changes, _) = watch::channel(0);
        Ok(Self {
            db: Mutex::new(conn),
            changes,
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs raw SQL against the store, bypassing the typed API.
    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<(), DbError> {
        self.conn().execute_batch(sql)?;
        Ok(())
    }

    fn notify_trackers_changed(&self) {
        self.changes.send_modify(|generation| *generation += 1);
    }

    /// Subscribes to tracker writes made through this handle.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// SQLite's `data_version`, which changes whenever another connection commits.
    pub fn data_version(&self) -> Result<i64, DbError> {
        let version = self
            .conn()
            .query_row("PRAGMA data_version", [], |row| row.get(0))?;
        Ok(version)
    }

    /// Inserts a tracker and returns its id
    pub fn insert_tracker(&self, tracker: &NewTracker) -> Result<i64, DbError> {
        let id = {
            let db = self.conn();
            db.execute(
                "INSERT INTO trackers (user, subject, course_number, course, section_index,
                                       semester, created_at, active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
                (
                    &tracker.user,
                    &tracker.subject,
                    &tracker.course_number,
                    &tracker.course,
                    &tracker.index,
                    tracker.semester,
                    tracker.created_at,
                ),
            )?;
            db.last_insert_rowid()
        };

        self.notify_trackers_changed();
        Ok(id)
    }

    /// Gets every tracker still flagged active.
    ///
    /// Rows are written by the client app; a row that does not decode is
    /// logged and skipped so it cannot hide the others.
    pub fn active_trackers(&self) -> Result<Vec<Tracker>, DbError> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {TRACKER_COLUMNS} FROM trackers WHERE active = 1 ORDER BY tracker_id"
        ))?;

        let rows = stmt.query_map([], |row| {
            let tracker_id: i64 = row.get(0)?;
            Ok((tracker_id, tracker_from_row(row)))
        })?;

        let mut trackers = Vec::new();
        for row in rows {
            match row? {
                (_, Ok(tracker)) => trackers.push(tracker),
                (tracker_id, Err(e)) => {
                    warn!(
                        tracker = tracker_id,
                        error = %e,
                        "Tracker row does not decode, skipping"
                    );
                }
            }
        }
        Ok(trackers)
    }

    pub fn tracker(&self, tracker_id: i64) -> Result<Option<Tracker>, DbError> {
        let db = self.conn();
        let tracker = db
            .query_row(
                &format!("SELECT {TRACKER_COLUMNS} FROM trackers WHERE tracker_id = ?"),
                [tracker_id],
                tracker_from_row,
            )
            .optional()?;
        Ok(tracker)
    }

    /// Flags a tracker inactive. Returns false if it was already inactive or missing.
    pub fn deactivate_tracker(&self, tracker_id: i64) -> Result<bool, DbError> {
        let changed = self.conn().execute(
            "UPDATE trackers SET active = 0 WHERE tracker_id = ? AND active = 1",
            [tracker_id],
        )?;

        if changed > 0 {
            self.notify_trackers_changed();
        }
        Ok(changed > 0)
    }

    /// Inserts or replaces a user's push token
    pub fn upsert_user(&self, user: &DbUser) -> Result<(), DbError> {
        self.conn().execute(
            "INSERT INTO users (user, r_token) VALUES (?1, ?2)
             ON CONFLICT(user) DO UPDATE SET r_token = excluded.r_token",
            (&user.user, &user.r_token),
        )?;
        Ok(())
    }

    /// Gets the push token registered for `user`, if any
    pub fn user_token(&self, user: &str) -> Result<Option<String>, DbError> {
        let token = self
            .conn()
            .query_row(
                "SELECT r_token FROM users WHERE user = ? LIMIT 1",
                [user],
                |row| row.get(0),
            )
            .optional()?;
        Ok(token)
    }

    /// Overwrites the given catalog documents in a single transaction.
    pub fn replace_catalog(&self, documents: &[CatalogDocument]) -> Result<(), DbError> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        for doc in documents {
            let body = serde_json::to_string(&doc.body)?;
            tx.execute(
                "INSERT OR REPLACE INTO catalog_documents (collection, document, body)
                 VALUES (?1, ?2, ?3)",
                (&doc.collection, &doc.document, body),
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Gets one catalog document body
    pub fn catalog_document(
        &self,
        collection: &str,
        document: &str,
    ) -> Result<Option<serde_json::Value>, DbError> {
        let body: Option<String> = self
            .conn()
            .query_row(
                "SELECT body FROM catalog_documents WHERE collection = ? AND document = ?",
                (collection, document),
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }
}

fn tracker_from_row(row: &Row<'_>) -> rusqlite::Result<Tracker> {
    Ok(Tracker {
        id: row.get(0)?,
        user: row.get(1)?,
        subject: row.get(2)?,
        course_number: row.get(3)?,
        course: row.get(4)?,
        index: row.get(5)?,
        semester: row.get(6)?,
        created_at: row.get(7)?,
        active: row.get(8)?,
    })
}
