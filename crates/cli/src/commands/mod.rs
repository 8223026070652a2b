mod alloc;
mod batch;
mod connect;
mod info;
mod queue;
mod run;

use fsched_protocol::JobStep;
use fsched_runtime::{InputMode, LocalInput, OutputSink, ResourceSync, SessionOrchestrator, terminal};
use tracing::{debug, info};

use crate::api::JobStepRequest;
use crate::cli::Commands;
use crate::context::CommandContext;
use crate::error::{CliError, Result};

/// Environment variable naming the job a step or session belongs to.
pub const JOB_ID_ENV: &str = "FLIGHT_JOB_ID";
const LEGACY_JOB_ID_ENV: &str = "JOB_ID";

/// Runs `command`, returning the process exit code on success.
pub async fn dispatch(command: Commands, ctx: &CommandContext) -> Result<i32> {
	info!(target = "fsched", command = command.name(), "running command");
	let code = match command {
		Commands::Info => info::execute(ctx).await?,
		Commands::Queue => queue::execute(ctx).await?,
		Commands::Batch { nodes, script, args } => batch::execute(ctx, nodes, &script, args).await?,
		Commands::Alloc { nodes, command } => alloc::execute(ctx, nodes, command).await?,
		Commands::Run { jobid, pty, command } => run::execute(ctx, jobid, pty, command).await?,
		Commands::Connect { jobid, command } => connect::execute(ctx, jobid, command).await?,
	};
	info!(target = "fsched", code, "command finished");
	Ok(code)
}

/// `--jobid`, then `$FLIGHT_JOB_ID`, then `$JOB_ID`.
pub(crate) fn resolve_job_id(flag: Option<String>) -> Result<String> {
	resolve_job_id_with(flag, |name| std::env::var(name).ok())
}

fn resolve_job_id_with(flag: Option<String>, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
	flag.or_else(|| lookup(JOB_ID_ENV))
		.or_else(|| lookup(LEGACY_JOB_ID_ENV))
		.filter(|id| !id.trim().is_empty())
		.ok_or_else(|| CliError::InvalidInput("--jobid must be given".into()))
}

/// Program to run when the user gave none: `$SHELL`, else `bash`.
pub(crate) fn default_shell() -> String {
	std::env::var("SHELL").ok().filter(|shell| !shell.is_empty()).unwrap_or_else(|| "bash".to_string())
}

/// Splits `command` into program and arguments, defaulting to the login shell.
pub(crate) fn program_and_args(mut command: Vec<String>) -> (String, Vec<String>) {
	if command.is_empty() {
		return (default_shell(), Vec::new());
	}
	let program = command.remove(0);
	(program, command)
}

/// Absolute path of `program` when it resolves locally; the name as given otherwise,
/// leaving the lookup to the execution nodes.
pub(crate) fn resolve_executable(program: &str) -> String {
	match which::which(program) {
		Ok(path) => path.to_string_lossy().into_owned(),
		Err(err) => {
			debug!(target = "fsched", program, error = %err, "executable not found locally");
			program.to_string()
		}
	}
}

/// Submits a job step, waits until its executions are placed and bridges
/// local stdin/stdout to them until the remote side finishes.
pub(crate) async fn run_job_step(ctx: &CommandContext, job_id: String, command: Vec<String>, pty: bool) -> Result<i32> {
	let (program, arguments) = program_and_args(command);
	let request = JobStepRequest {
		job_id,
		path: resolve_executable(&program),
		arguments,
		pty,
		environment: if pty { terminal::pty_environment() } else { Default::default() },
	};

	let step = ctx.api.create_job_step(&request).await?;
	println!("Job step {} added", step.id);

	let step = wait_for_step(ctx, &step).await?;
	println!("Job step running");

	SessionOrchestrator::new(&ctx.runtime)
		.run(&step, InputMode::from_pty(pty), LocalInput::stdin(), OutputSink::stdout(), terminal::interrupted())
		.await?;
	Ok(0)
}

async fn wait_for_step(ctx: &CommandContext, step: &JobStep) -> Result<JobStep> {
	let sync = ResourceSync::new(&ctx.runtime);
	let wait = sync.wait_until(
		|| {
			let api = ctx.api.clone();
			let job_id = step.job_id.clone();
			let step_id = step.id.clone();
			async move { api.fetch_job_step(&job_id, &step_id, true).await.map_err(|err| err.into_sync_error()) }
		},
		JobStep::is_ready,
	);

	tokio::select! {
		biased;
		_ = terminal::interrupted() => Err(fsched_runtime::Error::UserCancelled.into()),
		step = wait => Ok(step?),
	}
}

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn job_id_prefers_the_flag() {
		let id = resolve_job_id_with(Some("12".into()), |_| Some("99".into())).unwrap();
		assert_eq!(id, "12");
	}

	#[test]
	fn job_id_falls_back_to_the_environment() {
		let id = resolve_job_id_with(None, |name| (name == JOB_ID_ENV).then(|| "34".to_string())).unwrap();
		assert_eq!(id, "34");

		let id = resolve_job_id_with(None, |name| (name == "JOB_ID").then(|| "56".to_string())).unwrap();
		assert_eq!(id, "56");
	}

	#[test]
	fn missing_job_id_is_invalid_input() {
		let err = resolve_job_id_with(None, |_| None).unwrap_err();
		assert_eq!(err.to_string(), "--jobid must be given");
		assert_eq!(err.exit_code(), 2);
	}

	#[test]
	fn program_defaults_to_a_shell() {
		let (program, args) = program_and_args(vec!["hostname".into(), "-f".into()]);
		assert_eq!(program, "hostname");
		assert_eq!(args, vec!["-f".to_string()]);

		let (program, args) = program_and_args(Vec::new());
		assert!(!program.is_empty());
		assert!(args.is_empty());
	}

	#[test]
	fn unknown_executables_are_passed_through() {
		assert_eq!(resolve_executable("definitely-not-installed-fsched-tool"), "definitely-not-installed-fsched-tool");
	}
}
