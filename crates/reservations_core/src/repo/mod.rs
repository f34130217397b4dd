//! Repository layer: the constrained event store.
//!
//! # Responsibility
//! - Define the store contract the validator and reconciler depend on.
//! - Isolate SQLite query and constraint details from service logic.
//!
//! # Invariants
//! - The store, not the validator, is the source of truth for name
//!   uniqueness, positive duration, and non-overlap.
//! - Constraint rejections surface as `RepoError::Constraint`; everything
//!   else the database reports is an unclassified `RepoError::Db`.

pub mod event_repo;
