//! Scheduler resource API.
//!
//! [`SchedulerApi`] is the data-access seam the commands use; the HTTP
//! implementation speaks JSON:API documents to the controller.

mod decode;
mod error;
mod http;

use std::collections::BTreeMap;

use async_trait::async_trait;
use fsched_protocol::{Job, JobStep, Partition};

pub use error::{ApiError, ApiResult};
pub use http::HttpSchedulerApi;

/// Attributes of a job to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobRequest {
	pub min_nodes: Option<String>,
	pub script: Option<String>,
	pub script_name: Option<String>,
	pub arguments: Vec<String>,
}

/// Attributes of a job step to create inside an existing job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStepRequest {
	pub job_id: String,
	pub path: String,
	pub arguments: Vec<String>,
	pub pty: bool,
	pub environment: BTreeMap<String, String>,
}

#[async_trait]
pub trait SchedulerApi: Send + Sync {
	async fn create_job(&self, request: &JobRequest) -> ApiResult<Job>;

	/// Fetches a job; `long_poll` lets the server hold the request while the job is runnable.
	async fn fetch_job(&self, id: &str, long_poll: bool) -> ApiResult<Job>;

	async fn delete_job(&self, id: &str) -> ApiResult<()>;

	async fn list_jobs(&self) -> ApiResult<Vec<Job>>;

	async fn create_job_step(&self, request: &JobStepRequest) -> ApiResult<JobStep>;

	/// Fetches a job step with its executions; `long_poll` waits for submission.
	async fn fetch_job_step(&self, job_id: &str, step_id: &str, long_poll: bool) -> ApiResult<JobStep>;

	async fn list_partitions(&self) -> ApiResult<Vec<Partition>>;
}
