//! Decoded resource records.
//!
//! Each scheduler resource kind has an explicit record type. The `*Attributes`
//! structs mirror the `attributes` member of the wire resource object and
//! ignore fields they do not name; the plain records are assembled from an
//! attributes block plus its related resources.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Resource type name for jobs.
pub const JOB_TYPE: &str = "jobs";
/// Resource type name for job steps.
pub const JOB_STEP_TYPE: &str = "job-steps";
/// Resource type name for per-node executions of a job step.
pub const EXECUTION_TYPE: &str = "executions";
/// Resource type name for a job's shared environment.
pub const ENVIRONMENT_TYPE: &str = "environments";
/// Resource type name for partitions.
pub const PARTITION_TYPE: &str = "partitions";
/// Resource type name for nodes.
pub const NODE_TYPE: &str = "nodes";
/// Resource type name for array job tasks.
pub const TASK_TYPE: &str = "tasks";

/// Lifecycle state of a single execution on a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
	#[default]
	Pending,
	Running,
	Complete,
	Failed,
	#[serde(other)]
	Unknown,
}

impl ExecutionState {
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Complete | Self::Failed)
	}
}

/// One remote endpoint of a job step: the stepd daemon on `node:port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
	pub id: String,
	pub node: String,
	pub port: u16,
	pub state: ExecutionState,
}

impl Execution {
	/// `node:port` form used for logging and socket addressing.
	pub fn endpoint(&self) -> String {
		format!("{}:{}", self.node, self.port)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExecutionAttributes {
	pub node: String,
	pub port: u16,
	pub state: ExecutionState,
}

/// One executable invocation inside a job's allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStep {
	pub id: String,
	pub job_id: String,
	pub arguments: Vec<String>,
	pub path: String,
	pub pty: bool,
	pub submitted: bool,
	pub executions: Vec<Execution>,
}

impl JobStep {
	/// Identifier the API uses to address this step: `<job>.<step>`.
	pub fn qualified_id(&self) -> String {
		format!("{}.{}", self.job_id, self.id)
	}

	/// Ready to bridge once the scheduler has submitted it and placed executions.
	pub fn is_ready(&self) -> bool {
		self.submitted && !self.executions.is_empty()
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct JobStepAttributes {
	pub arguments: Vec<String>,
	pub path: String,
	pub pty: bool,
	#[serde(skip_serializing)]
	pub submitted: bool,
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub environment: BTreeMap<String, String>,
}

/// Scheduler-side job state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
	#[default]
	Pending,
	Configuring,
	Running,
	Cancelling,
	Cancelled,
	Completing,
	Completed,
	Failed,
	Timeout,
	#[serde(other)]
	Unknown,
}

impl JobState {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "PENDING",
			Self::Configuring => "CONFIGURING",
			Self::Running => "RUNNING",
			Self::Cancelling => "CANCELLING",
			Self::Cancelled => "CANCELLED",
			Self::Completing => "COMPLETING",
			Self::Completed => "COMPLETED",
			Self::Failed => "FAILED",
			Self::Timeout => "TIMEOUT",
			Self::Unknown => "UNKNOWN",
		}
	}
}

impl fmt::Display for JobState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct JobAttributes {
	#[serde(skip_serializing_if = "Option::is_none", deserialize_with = "string_or_number")]
	pub min_nodes: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub script: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub script_name: Option<String>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub arguments: Vec<String>,
	#[serde(skip_serializing)]
	pub state: JobState,
	#[serde(skip_serializing)]
	pub reason: Option<String>,
	#[serde(skip_serializing)]
	pub runnable: bool,
	#[serde(skip_serializing)]
	pub next_index: Option<u64>,
	#[serde(skip_serializing)]
	pub last_index: Option<u64>,
}

/// Node counts arrive as either `"2k"` style strings or bare integers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
		Some(serde_json::Value::String(s)) => Some(s),
		Some(serde_json::Value::Number(n)) => Some(n.to_string()),
		_ => None,
	})
}

/// A unit of work submitted to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
	pub id: String,
	pub state: JobState,
	pub reason: Option<String>,
	pub runnable: bool,
	pub min_nodes: Option<String>,
	pub script_name: Option<String>,
	pub partition: Option<String>,
	pub allocated_nodes: Vec<String>,
	pub environment: Option<Environment>,
	/// Index range of an array job: `(next, last)`.
	pub array_range: Option<(u64, u64)>,
	pub running_tasks: Vec<Task>,
}

/// One running task of an array job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
	pub index: u64,
	pub state: JobState,
	pub allocated_nodes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TaskAttributes {
	pub index: u64,
	pub state: JobState,
}

/// Environment variables the scheduler exports to every process of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
	pub hash: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PartitionAttributes {
	pub name: String,
	pub max_time_limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
	pub name: String,
	pub max_time_limit: Option<u64>,
	pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Node {
	pub name: String,
	pub state: String,
	pub cpus: Option<u32>,
	pub gpus: Option<u32>,
	pub memory: Option<u64>,
}
