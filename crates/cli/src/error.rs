use std::path::PathBuf;

use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Runtime(#[from] fsched_runtime::Error),

	#[error(transparent)]
	Api(#[from] ApiError),

	#[error("{0}")]
	InvalidInput(String),

	#[error("Could not locate: {}", .0.display())]
	Missing(PathBuf),

	#[error("command not found: {0}")]
	CommandNotFound(String),

	#[error("failed to obtain credentials: {0}")]
	Auth(String),

	#[error("{0}")]
	General(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

impl CliError {
	pub fn exit_code(&self) -> i32 {
		match self {
			Self::Runtime(err) => err.exit_code(),
			Self::Api(err) => err.exit_code(),
			Self::InvalidInput(_) | Self::Missing(_) => 2,
			Self::Auth(_) => 22,
			Self::CommandNotFound(_) => 127,
			_ => 1,
		}
	}

	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Runtime(err) if err.is_cancelled())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn exit_codes_follow_error_kind() {
		assert_eq!(CliError::from(fsched_runtime::Error::UserCancelled).exit_code(), 130);
		assert!(CliError::from(fsched_runtime::Error::UserCancelled).is_cancelled());
		assert_eq!(CliError::InvalidInput("--jobid must be given".into()).exit_code(), 2);
		assert_eq!(CliError::Auth("munge timed out".into()).exit_code(), 22);
		assert_eq!(CliError::CommandNotFound("sbatch".into()).exit_code(), 127);
		assert_eq!(CliError::General("job failed".into()).exit_code(), 1);
	}

	#[test]
	fn missing_path_message() {
		let err = CliError::Missing(PathBuf::from("job.sh"));
		assert_eq!(err.to_string(), "Could not locate: job.sh");
	}
}
