//! `fsched alloc`: hold an allocation for the lifetime of a local command.

use std::path::PathBuf;

use fsched_protocol::{Job, JobState};
use fsched_runtime::{ResourceSync, process, terminal};
use tracing::{debug, warn};

use super::batch::validate_nodes;
use super::program_and_args;
use crate::api::JobRequest;
use crate::context::CommandContext;
use crate::error::{CliError, Result};

pub(super) async fn execute(ctx: &CommandContext, nodes: Option<String>, command: Vec<String>) -> Result<i32> {
	let min_nodes = nodes.map(validate_nodes).transpose()?;
	let job = ctx
		.api
		.create_job(&JobRequest {
			min_nodes,
			..Default::default()
		})
		.await?;

	let job = match wait_for_allocation(ctx, job).await {
		Ok(job) => job,
		Err((id, err)) => {
			if err.is_cancelled() {
				release(ctx, &id).await;
			}
			return Err(err);
		}
	};

	if job.state != JobState::Running {
		return Err(CliError::General(format!(
			"Can not continue with the allocation as the job is in the {} state",
			job.state
		)));
	}
	println!("Job {} allocated resources", job.id);

	let (program, args) = program_and_args(command);
	let environment = job.environment.as_ref().map(|env| env.hash.clone()).unwrap_or_default();
	let outcome = process::run_with_environment(&program, &args, &environment).await;

	release(ctx, &job.id).await;
	println!("Job {} resources deallocated", job.id);

	match outcome {
		Ok(status) => Ok(process::exit_code(status)),
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(CliError::Missing(PathBuf::from(program))),
		Err(err) => Err(err.into()),
	}
}

/// Long-polls until the job leaves `PENDING`; an interrupt while queued cancels the wait.
async fn wait_for_allocation(ctx: &CommandContext, job: Job) -> std::result::Result<Job, (String, CliError)> {
	if job.state != JobState::Pending {
		return Ok(job);
	}
	println!("Job {} queued and waiting for resources", job.id);

	let sync = ResourceSync::new(&ctx.runtime);
	let wait = sync.wait_until(
		|| {
			let api = ctx.api.clone();
			let id = job.id.clone();
			async move { api.fetch_job(&id, true).await.map_err(|err| err.into_sync_error()) }
		},
		|job: &Job| job.state != JobState::Pending,
	);

	let result = tokio::select! {
		biased;
		_ = terminal::interrupted() => Err(fsched_runtime::Error::UserCancelled),
		job = wait => job,
	};
	result.map_err(|err| (job.id.clone(), err.into()))
}

async fn release(ctx: &CommandContext, id: &str) {
	match ctx.api.delete_job(id).await {
		Ok(()) => debug!(target = "fsched.alloc", job_id = id, "job deleted"),
		Err(err) => warn!(target = "fsched.alloc", job_id = id, error = %err, "failed to delete job"),
	}
}
