//! Field-scoped validation errors attached to an event candidate.
//!
//! # Responsibility
//! - Collect user-facing messages keyed by field or by the whole record
//!   (`base`).
//! - Render them in the `field -> [messages]` shape input forms consume.
//!
//! # Invariants
//! - Messages keep insertion order, both per field and across fields.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// Slot an error message is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorField {
    /// Whole-record errors such as interval overlap.
    Base,
    Name,
    StartDate,
    EndDate,
}

impl ErrorField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Name => "name",
            Self::StartDate => "start_date",
            Self::EndDate => "end_date",
        }
    }

    fn human_name(self) -> Option<&'static str> {
        match self {
            Self::Base => None,
            Self::Name => Some("Name"),
            Self::StartDate => Some("Start date"),
            Self::EndDate => Some("End date"),
        }
    }
}

/// Category of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingField,
    NameConflict,
    InvalidDuration,
    OverlapConflict,
}

/// One attached validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: ErrorField,
    pub kind: ErrorKind,
    pub message: String,
}

/// Ordered collection of validation errors. Empty means locally valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    entries: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: ErrorField, kind: ErrorKind, message: impl Into<String>) {
        self.entries.push(FieldError {
            field,
            kind,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.entries.iter()
    }

    /// Messages attached to `field`, in insertion order.
    pub fn on(&self, field: ErrorField) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.field == field)
            .map(|entry| entry.message.as_str())
            .collect()
    }

    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.entries.iter().any(|entry| entry.kind == kind)
    }

    /// `field-or-"base" -> messages` mapping.
    pub fn to_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entry in &self.entries {
            map.entry(entry.field.as_str().to_string())
                .or_default()
                .push(entry.message.clone());
        }
        map
    }

    /// Sentence-style messages, e.g. `"Name has already been taken"`.
    /// Base messages are returned unprefixed.
    pub fn full_messages(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| match entry.field.human_name() {
                Some(label) => format!("{label} {}", entry.message),
                None => entry.message.clone(),
            })
            .collect()
    }

    fn fields_in_order(&self) -> Vec<ErrorField> {
        let mut fields = Vec::new();
        for entry in &self.entries {
            if !fields.contains(&entry.field) {
                fields.push(entry.field);
            }
        }
        fields
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.fields_in_order();
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for field in fields {
            map.serialize_entry(field.as_str(), &self.on(field))?;
        }
        map.end()
    }
}
