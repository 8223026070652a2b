//! In-memory [`SchedulerApi`] for command tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fsched_protocol::{Job, JobState, JobStep, Partition};

use crate::api::{ApiError, ApiResult, JobRequest, JobStepRequest, SchedulerApi};
use crate::config::Config;
use crate::context::CommandContext;
use crate::output::OutputFormat;

#[derive(Default)]
pub(crate) struct FakeApi {
	pub jobs: Vec<Job>,
	pub partitions: Vec<Partition>,
	/// Returned by `create_job`, then by `fetch_job` once `fetches` runs dry.
	pub created_job: Option<Job>,
	pub fetches: Mutex<VecDeque<Job>>,
	pub created: Mutex<Vec<JobRequest>>,
	pub deleted: Mutex<Vec<String>>,
}

pub(crate) fn job(id: &str, state: JobState) -> Job {
	Job {
		id: id.to_string(),
		state,
		reason: None,
		runnable: state == JobState::Pending,
		min_nodes: Some("1".into()),
		script_name: None,
		partition: None,
		allocated_nodes: Vec::new(),
		environment: None,
		array_range: None,
		running_tasks: Vec::new(),
	}
}

pub(crate) fn context(api: FakeApi) -> (CommandContext, Arc<FakeApi>) {
	let api = Arc::new(api);
	let mut ctx = CommandContext::new(Config::default(), api.clone(), OutputFormat::Text, 0);
	ctx.runtime = ctx.runtime.with_poll_interval(Duration::from_millis(5));
	(ctx, api)
}

#[async_trait]
impl SchedulerApi for FakeApi {
	async fn create_job(&self, request: &JobRequest) -> ApiResult<Job> {
		self.created.lock().unwrap().push(request.clone());
		self.created_job.clone().ok_or_else(|| ApiError::Status {
			status: 500,
			message: "no job configured".into(),
		})
	}

	async fn fetch_job(&self, id: &str, _long_poll: bool) -> ApiResult<Job> {
		if let Some(job) = self.fetches.lock().unwrap().pop_front() {
			return Ok(job);
		}
		self.created_job.clone().ok_or_else(|| ApiError::NotFound {
			resource: format!("job {id}"),
		})
	}

	async fn delete_job(&self, id: &str) -> ApiResult<()> {
		self.deleted.lock().unwrap().push(id.to_string());
		Ok(())
	}

	async fn list_jobs(&self) -> ApiResult<Vec<Job>> {
		Ok(self.jobs.clone())
	}

	async fn create_job_step(&self, request: &JobStepRequest) -> ApiResult<JobStep> {
		Err(ApiError::NotFound {
			resource: format!("job {}", request.job_id),
		})
	}

	async fn fetch_job_step(&self, job_id: &str, step_id: &str, _long_poll: bool) -> ApiResult<JobStep> {
		Err(ApiError::NotFound {
			resource: format!("job step {job_id}.{step_id}"),
		})
	}

	async fn list_partitions(&self) -> ApiResult<Vec<Partition>> {
		Ok(self.partitions.clone())
	}
}
