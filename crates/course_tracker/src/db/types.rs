/// Database types for trackers, users and catalog documents
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::term::{Season, Term};

/// A user's standing request to be notified when one section opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    pub id: i64,
    pub user: String,
    pub subject: String,
    pub course_number: String,
    /// Display name of the course, e.g. "INTRO COMPUTER SCI"
    pub course: String,
    /// SOC section index
    pub index: String,
    pub semester: Season,
    pub created_at: DateTime<Utc>,
    pub active: bool,
}

impl Tracker {
    /// Whether this tracker is interested in `term`. The request year comes
    /// from the current date, so only the season is compared.
    pub fn watches(&self, term: &Term) -> bool {
        self.active && self.semester == term.season
    }
}

/// Fields for inserting a tracker; the id is assigned by the database.
#[derive(Debug, Clone)]
pub struct NewTracker {
    pub user: String,
    pub subject: String,
    pub course_number: String,
    pub course: String,
    pub index: String,
    pub semester: Season,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbUser {
    pub user: String,
    pub r_token: String,
}

impl ToSql for Season {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.name()))
    }
}

impl FromSql for Season {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// One stored catalog projection, e.g. collection `fall`, document `names`.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogDocument {
    pub collection: String,
    pub document: String,
    pub body: serde_json::Value,
}
