//! Local child processes launched inside a job allocation.

use std::collections::BTreeMap;
use std::io;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tracing::debug;

/// Runs `program` with the inherited stdio and environment plus `env`,
/// waiting for it to exit.
///
/// Interrupts received meanwhile are left to the child, which shares the
/// terminal's foreground process group; this process keeps waiting.
pub async fn run_with_environment(program: &str, args: &[String], env: &BTreeMap<String, String>) -> io::Result<ExitStatus> {
	let mut child = Command::new(program)
		.args(args)
		.envs(env)
		.stdin(Stdio::inherit())
		.stdout(Stdio::inherit())
		.stderr(Stdio::inherit())
		.spawn()?;
	debug!(target = "fsched.process", program, pid = child.id(), "spawned child");

	loop {
		tokio::select! {
			status = child.wait() => return status,
			signal = tokio::signal::ctrl_c() => {
				if signal.is_err() {
					return child.wait().await;
				}
				debug!(target = "fsched.process", "interrupt left to child");
			}
		}
	}
}

/// Exit code to propagate for `status`; signals map to `128 + signal`.
pub fn exit_code(status: ExitStatus) -> i32 {
	if let Some(code) = status.code() {
		return code;
	}

	#[cfg(unix)]
	{
		use std::os::unix::process::ExitStatusExt;
		if let Some(signal) = status.signal() {
			return 128 + signal;
		}
	}

	1
}
