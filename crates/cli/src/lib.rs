//! Flight Scheduler command line client.
//!
//! `main` parses arguments and hands them to [`run`], which loads the
//! configuration, initialises logging, builds the API client and dispatches
//! the subcommand, returning the process exit code.

pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod output;

use std::sync::Arc;

use colored::Colorize;
use tracing::debug;

use crate::api::HttpSchedulerApi;
use crate::cli::Cli;
use crate::config::Config;
use crate::context::CommandContext;
use crate::error::{CliError, Result};
use crate::logging::LogSettings;
use crate::output::{CommandResult, OutputFormat, print_result};

pub async fn run(cli: Cli) -> i32 {
	let format = cli.format;
	let command = cli.command.name();

	match execute(cli).await {
		Ok(code) => code,
		Err(err) => {
			report(&err, command, format);
			err.exit_code()
		}
	}
}

async fn execute(cli: Cli) -> Result<i32> {
	let config = Config::load(cli.config.as_deref())?;
	logging::init_logging(cli.verbose, &LogSettings::new(config.log_level.clone(), config.log_path.clone()));

	let credentials = config.auth_type.credentials().await?;
	let api = HttpSchedulerApi::new(&config, credentials)?;
	let ctx = CommandContext::new(config, Arc::new(api), cli.format, cli.verbose);
	commands::dispatch(cli.command, &ctx).await
}

fn report(err: &CliError, command: &str, format: OutputFormat) {
	if err.is_cancelled() {
		eprintln!("\n{}: Cancelled by user", "WARNING".yellow().underline());
		return;
	}

	debug!(target = "fsched", command, code = err.exit_code(), error = %err, "command failed");
	if format.is_structured() {
		print_result(&CommandResult::failure(command, err.exit_code(), err.to_string()), format, |_| String::new());
	} else {
		eprintln!("Error: {err}");
	}
}
