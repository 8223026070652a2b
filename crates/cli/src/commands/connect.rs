//! `fsched connect`: interactive session inside an existing job.

use fsched_runtime::{AttachRequest, InteractiveBridge, LocalInput, OutputSink, terminal};
use tracing::info;

use super::{program_and_args, resolve_job_id, run_job_step};
use crate::config::AttachTransport;
use crate::context::CommandContext;
use crate::error::Result;

pub(super) async fn execute(ctx: &CommandContext, jobid: Option<String>, command: Vec<String>) -> Result<i32> {
	let job_id = resolve_job_id(jobid)?;
	info!(target = "fsched.connect", job_id = %job_id, transport = ?ctx.config.attach_transport, "connecting");

	match ctx.config.attach_transport {
		AttachTransport::Direct => run_job_step(ctx, job_id, command, true).await,
		AttachTransport::Relay => {
			let (program, args) = program_and_args(command);
			let request = AttachRequest::new(job_id, program)
				.with_arguments(args)
				.with_env(terminal::pty_environment());

			InteractiveBridge::connect(&ctx.config.relay_address, &ctx.runtime)
				.await?
				.attach(request, LocalInput::stdin(), OutputSink::stdout(), terminal::interrupted())
				.await?;
			Ok(0)
		}
	}
}
