//! SQLite connection setup and schema versioning for the event store.
//!
//! # Responsibility
//! - Open connections with a bounded wait for the database write lock
//!   (`DbOptions::busy_timeout`).
//! - Bring the schema to the latest version: events table with the
//!   `positive_duration` check, unique name index, `no_overlaps` triggers.
//!
//! # Invariants
//! - The schema version lives in `PRAGMA user_version`; a newer database
//!   than this build understands is refused rather than downgraded.
//! - Failures here are never constraint violations. A lock wait that runs
//!   past the busy timeout is reported as `Sqlite` and is fatal to saves.

use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, open_db_with_options, DbOptions};

pub type DbResult<T> = Result<T, DbError>;

/// Storage failure below the constraint layer.
#[derive(Debug)]
pub enum DbError {
    /// Driver error, including `SQLITE_BUSY` after the busy timeout.
    Sqlite(rusqlite::Error),
    /// The file was migrated by a newer build.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl DbError {
    /// True when another connection held the write lock for longer than
    /// the configured busy timeout.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        )
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) if self.is_busy() => {
                write!(f, "event store is locked by another writer: {err}")
            }
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "event store schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
