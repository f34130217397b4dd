//! Core use-case services.
//!
//! # Responsibility
//! - Validate event candidates before writes.
//! - Orchestrate store writes and reconcile constraint races into
//!   user-facing errors.
//! - Keep CLI and other callers decoupled from storage details.

pub mod event_service;
pub mod validator;
