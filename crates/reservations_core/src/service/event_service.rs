//! Event use-case service and constraint reconciliation.
//!
//! # Responsibility
//! - Provide create/update/get/list entry points for input-form callers.
//! - Turn a store constraint rejection caused by a concurrent writer back
//!   into the same user-facing validation errors.
//!
//! # Invariants
//! - A save reports success only when the store committed the write.
//! - Constraint violations never escape as errors; other store failures
//!   always do.

use crate::model::errors::ValidationErrors;
use crate::model::event::{Event, EventCandidate, EventFields, EventId};
use crate::repo::event_repo::{EventRepository, RepoError, RepoResult};
use crate::service::validator::validate_event;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validates and writes `candidate`, reconciling store constraint races.
///
/// Flow:
/// 1. When `run_validation` is set, validate; on errors attach them and
///    return `Ok(false)` without touching the store.
/// 2. Insert (no id) or full-field update (id present).
/// 3. On success adopt the persisted record and return `Ok(true)`.
/// 4. On a name/overlap constraint violation, re-validate against the now
///    current store contents, attach the errors and return `Ok(false)`.
///
/// # Errors
/// Returns every store failure that is not a constraint violation,
/// including failures of the re-validation reads.
pub fn save_with_constraints<R>(
    repo: &R,
    candidate: &mut EventCandidate,
    run_validation: bool,
) -> RepoResult<bool>
where
    R: EventRepository + ?Sized,
{
    let op = if candidate.is_persisted() { "update" } else { "create" };
    candidate.errors.clear();

    if run_validation {
        let errors = validate_event(repo, candidate)?;
        if !errors.is_empty() {
            info!(
                "event=event_save module=service status=invalid op={op} error_count={}",
                errors.len()
            );
            candidate.errors = errors;
            return Ok(false);
        }
    }

    let fields = candidate.fields();
    let written = match candidate.id {
        Some(id) => repo.update_event(id, &fields),
        None => repo.create_event(&fields),
    };

    match written {
        Ok(event) => {
            info!("event=event_save module=service status=ok op={op}");
            candidate.mark_persisted(&event);
            Ok(true)
        }
        Err(RepoError::Constraint(violation)) => {
            info!(
                "event=validation_race module=service status=reconcile op={op} kind={}",
                violation.kind.as_str()
            );
            candidate.errors = validate_event(repo, candidate)?;
            if candidate.errors.is_empty() {
                // The competing write is no longer visible; the save still failed.
                warn!(
                    "event=validation_race module=service status=unexplained op={op} kind={}",
                    violation.kind.as_str()
                );
            }
            Ok(false)
        }
        Err(err) => {
            error!("event=event_save module=service status=error op={op} error={err}");
            Err(err)
        }
    }
}

/// Service error for event use-cases.
#[derive(Debug)]
pub enum EventServiceError {
    /// Target event does not exist.
    EventNotFound(EventId),
    /// Fatal persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for EventServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EventNotFound(id) => write!(f, "event not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent event state: {details}"),
        }
    }
}

impl Error for EventServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for EventServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::EventNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Result of a create or update call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Canonical persisted record.
    Saved(Event),
    /// Rejected input with its errors attached, ready to re-render.
    Invalid(EventCandidate),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }

    pub fn event(&self) -> Option<&Event> {
        match self {
            Self::Saved(event) => Some(event),
            Self::Invalid(_) => None,
        }
    }

    /// Attached errors; `None` when saved.
    pub fn errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Saved(_) => None,
            Self::Invalid(candidate) => Some(&candidate.errors),
        }
    }
}

/// Event service facade over repository implementations.
pub struct EventService<R: EventRepository> {
    repo: R,
}

impl<R: EventRepository> EventService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one event from caller fields.
    pub fn create(&self, fields: EventFields) -> Result<SaveOutcome, EventServiceError> {
        let candidate = EventCandidate::new(fields);
        self.save(candidate)
    }

    /// Replaces every field of an existing event.
    pub fn update(
        &self,
        id: EventId,
        fields: EventFields,
    ) -> Result<SaveOutcome, EventServiceError> {
        let existing = self
            .repo
            .get_event(id)?
            .ok_or(EventServiceError::EventNotFound(id))?;
        let mut candidate = EventCandidate::from_event(existing);
        candidate.assign(fields);
        self.save(candidate)
    }

    /// Gets one event by id.
    pub fn get(&self, id: EventId) -> Result<Option<Event>, EventServiceError> {
        Ok(self.repo.get_event(id)?)
    }

    /// Lists all events ascending by start date.
    pub fn list(&self) -> Result<Vec<Event>, EventServiceError> {
        Ok(self.repo.list_events()?)
    }

    fn save(&self, mut candidate: EventCandidate) -> Result<SaveOutcome, EventServiceError> {
        if !save_with_constraints(&self.repo, &mut candidate, true)? {
            return Ok(SaveOutcome::Invalid(candidate));
        }

        let id = candidate
            .id
            .ok_or(EventServiceError::InconsistentState("saved event has no id"))?;
        self.repo
            .get_event(id)?
            .map(SaveOutcome::Saved)
            .ok_or(EventServiceError::InconsistentState(
                "saved event not found in read-back",
            ))
    }
}
