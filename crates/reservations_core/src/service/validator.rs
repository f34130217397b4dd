//! Best-effort event validation.
//!
//! # Responsibility
//! - Produce user-facing, field-scoped messages before a write is tried.
//!
//! # Invariants
//! - Every check runs, so all applicable errors surface together.
//! - Date checks only run when both dates are present.
//! - Uniqueness and overlap are read-then-decide checks; the store's
//!   constraints remain authoritative under concurrent writers.

use crate::model::errors::{ErrorField, ErrorKind, ValidationErrors};
use crate::model::event::{Event, EventCandidate};
use crate::repo::event_repo::{EventRepository, RepoResult};

pub const BLANK_MESSAGE: &str = "can't be blank";
pub const TAKEN_MESSAGE: &str = "has already been taken";
pub const DURATION_MESSAGE: &str = "must be on or after start date";
pub const OVERLAP_MESSAGE_PREFIX: &str = "must not overlap existing events. Overlaps: ";

/// Validates `candidate` against current store contents.
///
/// Returns the collected errors; an empty set means locally valid. Store
/// read failures are returned as `Err` and must not be treated as
/// validation errors.
pub fn validate_event<R>(repo: &R, candidate: &EventCandidate) -> RepoResult<ValidationErrors>
where
    R: EventRepository + ?Sized,
{
    let mut errors = ValidationErrors::default();

    validate_presence(candidate, &mut errors);
    validate_name_uniqueness(repo, candidate, &mut errors)?;
    if let Some((start, end)) = candidate.date_range() {
        if end < start {
            errors.add(ErrorField::EndDate, ErrorKind::InvalidDuration, DURATION_MESSAGE);
        }
        let overlaps = repo.find_overlapping(start, end, candidate.id)?;
        if !overlaps.is_empty() {
            errors.add(
                ErrorField::Base,
                ErrorKind::OverlapConflict,
                overlap_message(&overlaps),
            );
        }
    }

    Ok(errors)
}

/// Builds the whole-record overlap message in the order events are given.
pub fn overlap_message(overlaps: &[Event]) -> String {
    let dates = overlaps
        .iter()
        .map(Event::date_range_label)
        .collect::<Vec<_>>()
        .join(", ");
    format!("{OVERLAP_MESSAGE_PREFIX}{dates}")
}

fn validate_presence(candidate: &EventCandidate, errors: &mut ValidationErrors) {
    let name_blank = candidate
        .name
        .as_deref()
        .map_or(true, |name| name.trim().is_empty());
    if name_blank {
        errors.add(ErrorField::Name, ErrorKind::MissingField, BLANK_MESSAGE);
    }
    if candidate.start_date.is_none() {
        errors.add(ErrorField::StartDate, ErrorKind::MissingField, BLANK_MESSAGE);
    }
    if candidate.end_date.is_none() {
        errors.add(ErrorField::EndDate, ErrorKind::MissingField, BLANK_MESSAGE);
    }
}

fn validate_name_uniqueness<R>(
    repo: &R,
    candidate: &EventCandidate,
    errors: &mut ValidationErrors,
) -> RepoResult<()>
where
    R: EventRepository + ?Sized,
{
    let Some(name) = candidate.name.as_deref() else {
        return Ok(());
    };
    if let Some(existing) = repo.find_by_name(name)? {
        if Some(existing.id) != candidate.id {
            errors.add(ErrorField::Name, ErrorKind::NameConflict, TAKEN_MESSAGE);
        }
    }
    Ok(())
}
