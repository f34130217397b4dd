//! Event domain model.
//!
//! # Responsibility
//! - Define the persisted `Event` record and the transient candidate that
//!   callers fill in before saving.
//! - Provide the closed-interval overlap predicate shared by validation
//!   and tests.
//!
//! # Invariants
//! - `end_date >= start_date` for every persisted event.
//! - Closed intervals of two distinct persisted events never intersect.
//! - `name` is unique among persisted events.
//! - `id` is assigned by the store and never changes.

use crate::model::errors::ValidationErrors;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier assigned by the store on creation.
pub type EventId = Uuid;

/// Date format used for storage, messages, and form input.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Canonical persisted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Event {
    /// Renders the occupied range as `"<start> to <end>"`.
    pub fn date_range_label(&self) -> String {
        format!(
            "{} to {}",
            self.start_date.format(DATE_FORMAT),
            self.end_date.format(DATE_FORMAT)
        )
    }

    /// Returns whether this event's closed interval intersects `[start, end]`.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        ranges_overlap(self.start_date, self.end_date, start, end)
    }
}

/// Closed-interval overlap: `[s1, e1]` and `[s2, e2]` intersect iff
/// `s1 <= e2 && s2 <= e1`. Touching endpoints overlap.
pub fn ranges_overlap(s1: NaiveDate, e1: NaiveDate, s2: NaiveDate, e2: NaiveDate) -> bool {
    s1 <= e2 && s2 <= e1
}

/// Raw field values supplied by a caller for create or full update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFields {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl EventFields {
    pub fn new(name: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            name: Some(name.into()),
            start_date: Some(start_date),
            end_date: Some(end_date),
        }
    }

    /// Builds fields from untyped form input.
    ///
    /// Blank or unparseable dates become `None` so they surface as presence
    /// errors. Names are kept exactly as given.
    pub fn from_params(name: &str, start_date: &str, end_date: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            start_date: parse_date_param(start_date),
            end_date: parse_date_param(end_date),
        }
    }
}

fn parse_date_param(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Transient event being created or edited.
///
/// Holds candidate field values plus the validation errors attached by the
/// last save attempt. Becomes persisted once a save assigns `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventCandidate {
    pub id: Option<EventId>,
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub errors: ValidationErrors,
}

impl EventCandidate {
    /// Creates an unsaved candidate from caller fields.
    pub fn new(fields: EventFields) -> Self {
        let mut candidate = Self::default();
        candidate.assign(fields);
        candidate
    }

    /// Loads an existing event for editing.
    pub fn from_event(event: Event) -> Self {
        Self {
            id: Some(event.id),
            name: Some(event.name),
            start_date: Some(event.start_date),
            end_date: Some(event.end_date),
            errors: ValidationErrors::default(),
        }
    }

    /// Replaces every editable field. Identity is untouched.
    pub fn assign(&mut self, fields: EventFields) {
        self.name = fields.name;
        self.start_date = fields.start_date;
        self.end_date = fields.end_date;
    }

    /// Returns the current field values as a write payload.
    pub fn fields(&self) -> EventFields {
        EventFields {
            name: self.name.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }

    /// Both dates, when present.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Adopts the canonical record returned by a successful save.
    pub fn mark_persisted(&mut self, event: &Event) {
        self.id = Some(event.id);
        self.name = Some(event.name.clone());
        self.start_date = Some(event.start_date);
        self.end_date = Some(event.end_date);
        self.errors.clear();
    }
}
