use thiserror::Error;

/// Errors raised by the tracker store.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Could not encode catalog document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Could not create database directory: {0}")]
    Io(#[from] std::io::Error),
}
