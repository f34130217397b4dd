//! Command-line adapter over `reservations_core`.
//!
//! # Responsibility
//! - Parse arguments, open the configured database, and call the core
//!   create/update/list operations.
//! - Print validation errors the way an input form would show them.

use clap::{Parser, Subcommand};
use reservations_core::db::open_db_with_options;
use reservations_core::{
    core_version, init_logging, CoreConfig, EventFields, EventId, EventService, SaveOutcome,
    SqliteEventRepository,
};
use std::process::ExitCode;

/// Manage date-ranged events that never overlap.
#[derive(Parser, Debug)]
#[command(name = "reservations_cli")]
#[command(about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// List events ordered by start date
    List,
    /// Create an event
    Create {
        /// Unique event name
        name: String,
        /// First day, YYYY-MM-DD
        start: String,
        /// Last day, YYYY-MM-DD
        end: String,
    },
    /// Replace every field of an existing event
    Update {
        /// Event id as printed by `list`
        id: EventId,
        name: String,
        start: String,
        end: String,
    },
    /// Print the core library version
    Version,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args.command) {
        Ok(code) => code,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<ExitCode, String> {
    match command {
        Command::Version => {
            println!("reservations_core version={}", core_version());
            Ok(ExitCode::SUCCESS)
        }
        Command::List => with_service(|service| {
            for event in service.list().map_err(|err| err.to_string())? {
                println!("{}\t{}\t{}", event.id, event.date_range_label(), event.name);
            }
            Ok(ExitCode::SUCCESS)
        }),
        Command::Create { name, start, end } => with_service(|service| {
            let outcome = service
                .create(EventFields::from_params(&name, &start, &end))
                .map_err(|err| err.to_string())?;
            Ok(report(&outcome, "created"))
        }),
        Command::Update {
            id,
            name,
            start,
            end,
        } => with_service(|service| {
            let outcome = service
                .update(id, EventFields::from_params(&name, &start, &end))
                .map_err(|err| err.to_string())?;
            Ok(report(&outcome, "updated"))
        }),
    }
}

/// Opens the configured database and runs `action` against it.
fn with_service<F>(action: F) -> Result<ExitCode, String>
where
    F: FnOnce(&EventService<SqliteEventRepository<'_>>) -> Result<ExitCode, String>,
{
    let config = CoreConfig::from_env()?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(&config.log_level, &log_dir.to_string_lossy())?;
    }
    let conn = open_db_with_options(&config.db_path, config.db_options())
        .map_err(|err| err.to_string())?;
    let repo = SqliteEventRepository::try_new(&conn).map_err(|err| err.to_string())?;
    action(&EventService::new(repo))
}

fn report(outcome: &SaveOutcome, verb: &str) -> ExitCode {
    match outcome {
        SaveOutcome::Saved(event) => {
            println!("event {verb}: {} {}", event.id, event.date_range_label());
            ExitCode::SUCCESS
        }
        SaveOutcome::Invalid(candidate) => {
            eprintln!("there was a problem saving this event:");
            for message in candidate.errors.full_messages() {
                eprintln!("  - {message}");
            }
            ExitCode::FAILURE
        }
    }
}
