use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("failed to connect to {endpoint}: {source}")]
	Connect {
		endpoint: String,
		#[source]
		source: io::Error,
	},

	#[error("transport error on {endpoint}: {source}")]
	Transport {
		endpoint: String,
		#[source]
		source: io::Error,
	},

	#[error("input channel is closed")]
	ClosedChannel,

	#[error("connection to {0} was already started")]
	AlreadyConnected(String),

	#[error("pseudo-terminal sessions need exactly one execution, the job step has {0}")]
	UnsupportedTopology(usize),

	#[error("job step has no executions to connect to")]
	NoExecutions,

	#[error("none of the {0} execution(s) could be reached")]
	NoReachableExecution(usize),

	#[error("{0} no longer exists")]
	ResourceGone(String),

	#[error("unable to reach the scheduler: {0}")]
	ConnectionFailure(String),

	#[error("relay did not start the interactive job: {0}")]
	AttachRejected(String),

	#[error("interactive job failed: {0}")]
	InteractiveJobFailed(String),

	#[error("relay protocol error: {0}")]
	Protocol(String),

	#[error("cancelled by user")]
	UserCancelled,

	#[error(transparent)]
	Io(#[from] io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
	/// Process exit status for this failure.
	pub fn exit_code(&self) -> i32 {
		match self {
			Self::UserCancelled => 130,
			Self::UnsupportedTopology(_) | Self::NoExecutions => 2,
			Self::ConnectionFailure(_) => 3,
			Self::ResourceGone(_) => 4,
			Self::AttachRejected(_) => 5,
			_ => 1,
		}
	}

	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::UserCancelled)
	}
}

/// Returns `true` for I/O errors that just mean the other end finished first.
///
/// These are absorbed by the copy loops instead of being reported.
pub fn is_expected_stream_end(err: &io::Error) -> bool {
	matches!(
		err.kind(),
		io::ErrorKind::ConnectionReset
			| io::ErrorKind::ConnectionAborted
			| io::ErrorKind::BrokenPipe
			| io::ErrorKind::NotConnected
			| io::ErrorKind::UnexpectedEof
	) || is_closed_descriptor(err)
}

#[cfg(unix)]
const EBADF: i32 = 9;
#[cfg(unix)]
const EIO: i32 = 5;

#[cfg(unix)]
fn is_closed_descriptor(err: &io::Error) -> bool {
	// The descriptor or its terminal went away underneath us.
	matches!(err.raw_os_error(), Some(EBADF | EIO))
}

#[cfg(not(unix))]
fn is_closed_descriptor(_err: &io::Error) -> bool {
	false
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stream_end_classification() {
		assert!(is_expected_stream_end(&io::Error::from(io::ErrorKind::ConnectionReset)));
		assert!(is_expected_stream_end(&io::Error::from(io::ErrorKind::BrokenPipe)));
		assert!(is_expected_stream_end(&io::Error::from(io::ErrorKind::UnexpectedEof)));
		assert!(!is_expected_stream_end(&io::Error::from(io::ErrorKind::PermissionDenied)));
		assert!(!is_expected_stream_end(&io::Error::from(io::ErrorKind::TimedOut)));
	}

	#[cfg(unix)]
	#[test]
	fn closed_descriptor_is_expected() {
		assert!(is_expected_stream_end(&io::Error::from_raw_os_error(EBADF)));
		assert!(is_expected_stream_end(&io::Error::from_raw_os_error(EIO)));
		assert!(!is_expected_stream_end(&io::Error::from_raw_os_error(13)));
	}

	#[test]
	fn exit_codes_distinguish_error_kinds() {
		assert_eq!(Error::UserCancelled.exit_code(), 130);
		assert_eq!(Error::UnsupportedTopology(2).exit_code(), 2);
		assert_eq!(Error::ConnectionFailure("down".into()).exit_code(), 3);
		assert_eq!(Error::ResourceGone("job 1".into()).exit_code(), 4);
		assert_eq!(Error::AttachRejected("busy".into()).exit_code(), 5);
		assert_eq!(Error::ClosedChannel.exit_code(), 1);
		assert_eq!(Error::InteractiveJobFailed("node lost".into()).exit_code(), 1);
	}
}
