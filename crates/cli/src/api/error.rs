use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
	#[error("Unable to connect to the Flight Scheduler API: {0}")]
	Connection(#[source] reqwest::Error),

	#[error("{resource} could not be found")]
	NotFound { resource: String },

	#[error("the scheduler rejected the request ({status}): {message}")]
	Status { status: u16, message: String },

	#[error("unexpected response for {resource}: {message}")]
	Decode { resource: String, message: String },

	#[error("invalid scheduler url: {0}")]
	Url(#[from] url::ParseError),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
	pub fn exit_code(&self) -> i32 {
		match self {
			Self::Connection(_) => 3,
			Self::NotFound { .. } => 4,
			Self::Url(_) => 2,
			_ => 1,
		}
	}

	/// Maps a failed fetch inside a long-poll loop onto the runtime's taxonomy.
	pub fn into_sync_error(self) -> fsched_runtime::Error {
		match self {
			Self::NotFound { resource } => fsched_runtime::Error::ResourceGone(resource),
			other => fsched_runtime::Error::ConnectionFailure(other.to_string()),
		}
	}
}
