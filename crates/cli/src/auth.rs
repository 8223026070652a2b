//! Credentials sent with every scheduler API request.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::error::{CliError, Result};

const MUNGE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
	/// Local user name, no token.
	#[default]
	Basic,
	/// Token issued by `munge -n`.
	Munge,
}

/// A `(principal, token)` pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
	pub principal: String,
	pub token: String,
}

impl std::fmt::Debug for Credentials {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Credentials")
			.field("principal", &self.principal)
			.field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
			.finish()
	}
}

impl AuthType {
	pub async fn credentials(self) -> Result<Credentials> {
		let principal = local_user().await?;
		let token = match self {
			Self::Basic => String::new(),
			Self::Munge => munge_token().await?,
		};
		debug!(target = "fsched.auth", auth = ?self, principal = %principal, "obtained credentials");
		Ok(Credentials { principal, token })
	}
}

async fn local_user() -> Result<String> {
	for var in ["USER", "LOGNAME"] {
		if let Ok(name) = std::env::var(var) {
			if !name.trim().is_empty() {
				return Ok(name.trim().to_string());
			}
		}
	}

	let output = Command::new("id").arg("-un").output().await?;
	let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
	if !output.status.success() || name.is_empty() {
		return Err(CliError::Auth("unable to determine the local user name".into()));
	}
	Ok(name)
}

async fn munge_token() -> Result<String> {
	run_token_helper("munge", &["-n"], MUNGE_TIMEOUT).await
}

async fn run_token_helper(program: &str, args: &[&str], limit: Duration) -> Result<String> {
	let mut command = Command::new(program);
	command.args(args).kill_on_drop(true);

	let output = match tokio::time::timeout(limit, command.output()).await {
		Ok(Ok(output)) => output,
		Ok(Err(err)) => return Err(CliError::Auth(format!("unable to run {program}: {err}"))),
		Err(_) => return Err(CliError::Auth(format!("{program} did not respond within {}s", limit.as_secs()))),
	};

	let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
	if !output.status.success() || token.is_empty() {
		return Err(CliError::Auth(format!("unable to obtain {program} token")));
	}
	Ok(token)
}
