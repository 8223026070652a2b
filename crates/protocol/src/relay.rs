//! Interactive relay messages.
//!
//! One JSON object per line over a single full-duplex stream, discriminated
//! by the `command` field.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum RelayMessage {
	/// Client request to start an interactive process inside `job_id`.
	#[serde(rename = "RUN_INTERACTIVE_JOB")]
	RunInteractiveJob {
		#[serde(rename = "jobId")]
		job_id: String,
		executable: String,
		#[serde(default)]
		arguments: Vec<String>,
		#[serde(default)]
		env: BTreeMap<String, String>,
	},
	#[serde(rename = "INTERACTIVE_JOB_STARTED")]
	InteractiveJobStarted,
	#[serde(rename = "INTERACTIVE_JOB_FAILED")]
	InteractiveJobFailed {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		error: Option<String>,
	},
	/// Remote process output, relay to client.
	#[serde(rename = "output")]
	Output { output: String },
	/// Local input, client to relay.
	#[serde(rename = "input")]
	Input { input: String },
	#[serde(other)]
	Unknown,
}

impl RelayMessage {
	/// Serializes as a single newline-terminated frame.
	pub fn to_line(&self) -> serde_json::Result<String> {
		let mut line = serde_json::to_string(self)?;
		line.push('\n');
		Ok(line)
	}

	pub fn from_line(line: &str) -> serde_json::Result<Self> {
		serde_json::from_str(line.trim_end_matches(['\r', '\n']))
	}

	pub fn command(&self) -> &'static str {
		match self {
			Self::RunInteractiveJob { .. } => "RUN_INTERACTIVE_JOB",
			Self::InteractiveJobStarted => "INTERACTIVE_JOB_STARTED",
			Self::InteractiveJobFailed { .. } => "INTERACTIVE_JOB_FAILED",
			Self::Output { .. } => "output",
			Self::Input { .. } => "input",
			Self::Unknown => "unknown",
		}
	}
}
