use serde::Serialize;

/// Envelope for structured command output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
}

impl<T: Serialize> CommandResult<T> {
	pub fn success(command: impl Into<String>, data: T) -> Self {
		Self {
			ok: true,
			command: command.into(),
			data: Some(data),
			error: None,
		}
	}
}

impl CommandResult<()> {
	pub fn failure(command: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
		Self {
			ok: false,
			command: command.into(),
			data: None,
			error: Some(CommandError {
				code,
				message: message.into(),
			}),
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandError {
	/// Process exit code the failure maps to.
	pub code: i32,
	pub message: String,
}

/// One `info` row: a partition's nodes sharing a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionSummary {
	pub partition: String,
	pub avail: String,
	pub time_limit: String,
	pub nodes: usize,
	pub state: String,
	pub node_list: Vec<String>,
}

/// One `queue` row: a job, or a running task of an array job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
	pub job_id: String,
	pub partition: String,
	pub name: String,
	pub state: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub nodes: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
	pub node_list: Vec<String>,
}

/// Outcome of a `batch` submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedJob {
	pub job_id: String,
	pub script_name: String,
}
