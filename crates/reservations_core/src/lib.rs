//! Core domain logic for date-ranged event reservations.
//! This crate is the single source of truth for the non-overlap and
//! unique-name invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::errors::{ErrorField, ErrorKind, FieldError, ValidationErrors};
pub use model::event::{ranges_overlap, Event, EventCandidate, EventFields, EventId};
pub use repo::event_repo::{
    ConstraintKind, ConstraintViolation, EventRepository, RepoError, RepoResult,
    SqliteEventRepository,
};
pub use service::event_service::{
    save_with_constraints, EventService, EventServiceError, SaveOutcome,
};
pub use service::validator::validate_event;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
