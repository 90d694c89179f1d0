// src/bin/wdm.rs

use anyhow::Result;
use clap::Parser;
use colored::*;
use std::io::Write;
use wdm::{
    cli::{Action, Cli, handlers},
    constants::{ENV_FILES, LOG_LEVEL_ENV},
    core::{resolver::ResolveError, summary::ExitSignal},
    models::RunMode,
};

/// Exit code of failed resolutions.
const EXIT_FAILURE: i32 = 1;
/// Exit code of invalid invocations, invalid definition files and unexpected errors.
const EXIT_ERROR: i32 = 2;

/// Loads `.wdm_env` then `.wdm_env.generated` from the working directory.
/// Variables already set in the environment win. Returns the messages to log once the
/// logger is configured, as the files may set `LOGLEVEL`.
fn load_env_files() -> Vec<(log::Level, String)> {
    let mut messages = Vec::new();
    for file in ENV_FILES {
        match dotenvy::from_filename(file) {
            Ok(_) => messages.push((log::Level::Debug, format!("Loaded environment from '{}'.", file))),
            Err(e) if e.not_found() => {}
            Err(e) => messages.push((log::Level::Warn, format!("Invalid environment file '{}': {}", file, e))),
        }
    }
    messages
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or(LOG_LEVEL_ENV, "debug"))
        .format(|buf, record| writeln!(buf, "{:>6} | {}", record.level(), record.args()))
        .init();
}

/// Maps an error to the process exit code.
///
/// Only resolution failures give [`EXIT_FAILURE`]: a `UsageError`, a `PopulateError` or
/// any unexpected error gives [`EXIT_ERROR`].
fn exit_code(e: &anyhow::Error) -> i32 {
    if e.downcast_ref::<ResolveError>().is_some() {
        EXIT_FAILURE
    } else {
        EXIT_ERROR
    }
}

/// The main entry point of the `wdm` application.
/// It loads the environment files, sets up logging, parses arguments, dispatches to the
/// correct handler, and performs centralized error handling.
fn main() {
    let env_messages = load_env_files();
    init_logger();
    for (level, message) in env_messages {
        log::log!(level, "{}", message);
    }

    match run_cli(Cli::parse()) {
        Ok(signal) => std::process::exit(signal.exit_code()),
        Err(e) => {
            // --- Centralized Error Handling ---
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            std::process::exit(exit_code(&e));
        }
    }
}

/// Routes the parsed command line to its handler.
fn run_cli(cli: Cli) -> Result<ExitSignal> {
    log::debug!("CLI args parsed: {:?}", cli);

    match &cli.action {
        Action::Dryrun(args) => handlers::run::handle(RunMode::DryRun, args),
        Action::Test(args) => handlers::run::handle(RunMode::TestOnly, args),
        Action::Ensure(args) => handlers::run::handle(RunMode::Ensure, args),
        Action::List(args) => handlers::list::handle(args).map(|_| ExitSignal::AllPassed),
        Action::Example => {
            handlers::example::handle();
            Ok(ExitSignal::AllPassed)
        }
    }
}
