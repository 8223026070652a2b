use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "fsched")]
#[command(about = "Flight Scheduler - submit and interact with jobs from the command line")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Read configuration from FILE instead of the default location
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Output format for listings and submissions
	#[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
	pub format: OutputFormat,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
	/// List the available partitions
	Info,

	/// List the queued and running jobs
	#[command(alias = "squeue")]
	Queue,

	/// Schedule a batch script
	Batch {
		/// The minimum number of required nodes
		#[arg(short = 'N', long)]
		nodes: Option<String>,

		/// Batch script; must start with #!
		script: String,

		/// Arguments passed to the script
		#[arg(trailing_var_arg = true, allow_hyphen_values = true)]
		args: Vec<String>,
	},

	/// Allocate resources and run a command while they are held
	Alloc {
		/// The minimum number of required nodes
		#[arg(short = 'N', long)]
		nodes: Option<String>,

		/// Command to run (defaults to $SHELL)
		#[arg(trailing_var_arg = true, allow_hyphen_values = true)]
		command: Vec<String>,
	},

	/// Run a job step inside an existing job
	Run {
		/// Job to add the step to (defaults to $FLIGHT_JOB_ID)
		#[arg(long)]
		jobid: Option<String>,

		/// Run the step under a pseudo-terminal
		#[arg(long)]
		pty: bool,

		/// Command and its arguments
		#[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
		command: Vec<String>,
	},

	/// Open an interactive session inside an existing job
	Connect {
		/// Job to attach to (defaults to $FLIGHT_JOB_ID)
		#[arg(long)]
		jobid: Option<String>,

		/// Command to run (defaults to $SHELL)
		#[arg(trailing_var_arg = true, allow_hyphen_values = true)]
		command: Vec<String>,
	},
}

impl Commands {
	pub fn name(&self) -> &'static str {
		match self {
			Self::Info => "info",
			Self::Queue => "queue",
			Self::Batch { .. } => "batch",
			Self::Alloc { .. } => "alloc",
			Self::Run { .. } => "run",
			Self::Connect { .. } => "connect",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::error::ErrorKind;

	#[test]
	fn run_keeps_command_flags_for_the_remote_side() {
		let cli = Cli::try_parse_from(["fsched", "run", "--jobid", "7", "--pty", "ls", "-la", "--color"]).unwrap();
		assert_eq!(
			cli.command,
			Commands::Run {
				jobid: Some("7".into()),
				pty: true,
				command: vec!["ls".into(), "-la".into(), "--color".into()],
			}
		);
	}

	#[test]
	fn run_requires_a_command() {
		let err = Cli::try_parse_from(["fsched", "run", "--jobid", "7"]).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
	}

	#[test]
	fn batch_takes_nodes_and_script_arguments() {
		let cli = Cli::try_parse_from(["fsched", "-v", "batch", "-N", "2", "job.sh", "--input", "data"]).unwrap();
		assert_eq!(cli.verbose, 1);
		assert_eq!(
			cli.command,
			Commands::Batch {
				nodes: Some("2".into()),
				script: "job.sh".into(),
				args: vec!["--input".into(), "data".into()],
			}
		);
	}

	#[test]
	fn global_options_follow_the_subcommand() {
		let cli = Cli::try_parse_from(["fsched", "queue", "--format", "json", "--config", "/tmp/fsched.json"]).unwrap();
		assert_eq!(cli.format, OutputFormat::Json);
		assert_eq!(cli.config, Some(PathBuf::from("/tmp/fsched.json")));
		assert_eq!(cli.command.name(), "queue");
	}

	#[test]
	fn unknown_subcommand_is_reported_as_such() {
		let err = Cli::try_parse_from(["fsched", "sbatch-ish"]).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
	}
}
