//! `fsched run`: execute a command as a job step and stream its I/O.

use super::{resolve_job_id, run_job_step};
use crate::context::CommandContext;
use crate::error::Result;

pub(super) async fn execute(ctx: &CommandContext, jobid: Option<String>, pty: bool, command: Vec<String>) -> Result<i32> {
	let job_id = resolve_job_id(jobid)?;
	run_job_step(ctx, job_id, command, pty).await
}
