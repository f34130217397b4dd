//! Event repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist events under the store-level constraints installed by
//!   migrations: unique `name`, `positive_duration`, `no_overlaps`.
//! - Report constraint rejections as typed `ConstraintViolation`s.
//! - Serve the reads the validator relies on.
//!
//! # Invariants
//! - Every write runs in a `BEGIN IMMEDIATE` transaction, so concurrent
//!   writers serialize and each write's constraint checks see all
//!   previously committed rows.
//! - Constraint classification uses SQLite extended result codes, never
//!   error message text.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::event::{Event, EventFields, EventId};
use chrono::{Datelike, NaiveDate};
use rusqlite::{ffi, params, Connection, ErrorCode, Row, Rows, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const EVENT_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    start_date,
    end_date
FROM events";

pub type RepoResult<T> = Result<T, RepoError>;

/// Store-level constraint that rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// `index_events_on_name` unique index.
    NameConflict,
    /// `no_overlaps` exclusion triggers.
    OverlapConflict,
}

impl ConstraintKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NameConflict => "name_conflict",
            Self::OverlapConflict => "overlap_conflict",
        }
    }

    /// Schema object that enforces this constraint.
    pub fn constraint_name(self) -> &'static str {
        match self {
            Self::NameConflict => "index_events_on_name",
            Self::OverlapConflict => "no_overlaps",
        }
    }
}

/// Typed rejection raised atomically with a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintViolation {
    pub kind: ConstraintKind,
}

impl Display for ConstraintViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "constraint `{}` rejected write ({})",
            self.kind.constraint_name(),
            self.kind.as_str()
        )
    }
}

impl Error for ConstraintViolation {}

/// Repository error for event persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Unclassified storage failure: I/O, busy timeout, schema, other
    /// constraint kinds. Always fatal to callers.
    Db(DbError),
    Constraint(ConstraintViolation),
    NotFound(EventId),
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    /// Returns the constraint kind when this error is a typed violation.
    pub fn constraint_kind(&self) -> Option<ConstraintKind> {
        match self {
            Self::Constraint(violation) => Some(violation.kind),
            _ => None,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Constraint(violation) => write!(f, "{violation}"),
            Self::NotFound(id) => write!(f, "event not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted event data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "event repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "event repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "event repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Constraint(violation) => Some(violation),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ConstraintViolation> for RepoError {
    fn from(value: ConstraintViolation) -> Self {
        Self::Constraint(value)
    }
}

/// Constrained store interface.
pub trait EventRepository {
    /// Inserts a new event and returns the canonical record with its
    /// store-assigned id.
    fn create_event(&self, fields: &EventFields) -> RepoResult<Event>;
    /// Replaces all fields of an existing event.
    fn update_event(&self, id: EventId, fields: &EventFields) -> RepoResult<Event>;
    fn get_event(&self, id: EventId) -> RepoResult<Option<Event>>;
    fn find_by_name(&self, name: &str) -> RepoResult<Option<Event>>;
    /// Events whose closed interval intersects `[start, end]`, ascending by
    /// `start_date`.
    fn find_overlapping(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<EventId>,
    ) -> RepoResult<Vec<Event>>;
    /// All events ascending by `start_date`.
    fn list_events(&self) -> RepoResult<Vec<Event>>;
}

/// SQLite-backed event repository.
pub struct SqliteEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` on schema drift.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_event_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn create_event(&self, fields: &EventFields) -> RepoResult<Event> {
        let id = Uuid::new_v4();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO events (
                uuid,
                name,
                start_date,
                end_date
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                fields.name.as_deref(),
                fields.start_date.map(format_date),
                fields.end_date.map(format_date),
            ],
        )
        .map_err(classify_write_error)?;

        let event = load_required_event(&tx, id)?;
        tx.commit()?;
        Ok(event)
    }

    fn update_event(&self, id: EventId, fields: &EventFields) -> RepoResult<Event> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx
            .execute(
                "UPDATE events
                 SET
                    name = ?1,
                    start_date = ?2,
                    end_date = ?3
                 WHERE uuid = ?4;",
                params![
                    fields.name.as_deref(),
                    fields.start_date.map(format_date),
                    fields.end_date.map(format_date),
                    id.to_string(),
                ],
            )
            .map_err(classify_write_error)?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        let event = load_required_event(&tx, id)?;
        tx.commit()?;
        Ok(event)
    }

    fn get_event(&self, id: EventId) -> RepoResult<Option<Event>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EVENT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_event_row(row)?));
        }
        Ok(None)
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Event>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EVENT_SELECT_SQL} WHERE name = ?1 LIMIT 1;"))?;
        let mut rows = stmt.query([name])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_event_row(row)?));
        }
        Ok(None)
    }

    fn find_overlapping(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<EventId>,
    ) -> RepoResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EVENT_SELECT_SQL}
             WHERE start_date <= ?2
               AND ?1 <= end_date
               AND (?3 IS NULL OR uuid <> ?3)
             ORDER BY start_date ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![
            format_date(start),
            format_date(end),
            exclude.map(|id| id.to_string()),
        ])?;
        collect_events(&mut rows)
    }

    fn list_events(&self) -> RepoResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EVENT_SELECT_SQL} ORDER BY start_date ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        collect_events(&mut rows)
    }
}

/// Maps store-level constraint failures to typed violations.
///
/// Only the unique name index and the overlap triggers are classified. The
/// `positive_duration` check and NOT NULL failures stay fatal: validation
/// is expected to catch them before any write.
fn classify_write_error(err: rusqlite::Error) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            let kind = match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE => Some(ConstraintKind::NameConflict),
                ffi::SQLITE_CONSTRAINT_TRIGGER => Some(ConstraintKind::OverlapConflict),
                _ => None,
            };
            if let Some(kind) = kind {
                return RepoError::Constraint(ConstraintViolation { kind });
            }
        }
    }
    RepoError::from(err)
}

fn load_required_event(conn: &Connection, id: EventId) -> RepoResult<Event> {
    let mut stmt = conn.prepare(&format!("{EVENT_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return parse_event_row(row);
    }
    Err(RepoError::NotFound(id))
}

fn collect_events(rows: &mut Rows<'_>) -> RepoResult<Vec<Event>> {
    let mut events = Vec::new();
    while let Some(row) = rows.next()? {
        events.push(parse_event_row(row)?);
    }
    Ok(events)
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<Event> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in events.uuid"))
    })?;
    let start_date = parse_date_column(row, "start_date")?;
    let end_date = parse_date_column(row, "end_date")?;
    if end_date < start_date {
        return Err(RepoError::InvalidData(format!(
            "event {id} ends before it starts"
        )));
    }

    Ok(Event {
        id,
        name: row.get("name")?,
        start_date,
        end_date,
    })
}

/// Dates are stored as day numbers counted from 0001-01-01 (day 1), so
/// SQL comparisons follow calendar order for every year chrono accepts.
fn parse_date_column(row: &Row<'_>, column: &'static str) -> RepoResult<NaiveDate> {
    let day: i64 = row.get(column)?;
    i32::try_from(day)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid day `{day}` in events.{column}")))
}

fn format_date(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce())
}

fn ensure_event_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "events")? {
        return Err(RepoError::MissingRequiredTable("events"));
    }

    for column in ["uuid", "name", "start_date", "end_date"] {
        if !table_has_column(conn, "events", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "events",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
