//! Event domain model.
//!
//! # Responsibility
//! - Define the persisted record, the transient candidate, and the
//!   validation error shapes used by core business logic.
//!
//! # Invariants
//! - Every persisted event is identified by a store-assigned `EventId`.
//! - Persisted events change only through full-field updates.

pub mod errors;
pub mod event;
