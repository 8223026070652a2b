//! reqwest-backed [`SchedulerApi`].

use std::time::Duration;

use async_trait::async_trait;
use fsched_protocol::{
	Document, ErrorDocument, JOB_STEP_TYPE, JOB_TYPE, Job, JobAttributes, JobStep, JobStepAttributes, Linkage, MEDIA_TYPE, PARTITION_TYPE, Partition,
	PartitionAttributes, ResourceIdentifier, ResourceObject,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::decode;
use super::{ApiError, ApiResult, JobRequest, JobStepRequest, SchedulerApi};
use crate::auth::Credentials;
use crate::config::Config;

const JOB_INCLUDES: &str = "partition,allocated-nodes,shared-environment,running-tasks,running-tasks.allocated-nodes";
const JOB_STEP_INCLUDES: &str = "executions";
const PARTITION_INCLUDES: &str = "nodes";

pub struct HttpSchedulerApi {
	client: reqwest::Client,
	root: Url,
	credentials: Credentials,
	long_poll_timeout: Duration,
}

impl HttpSchedulerApi {
	pub fn new(config: &Config, credentials: Credentials) -> ApiResult<Self> {
		let client = reqwest::Client::builder()
			.timeout(config.request_timeout())
			.build()
			.map_err(ApiError::Connection)?;

		Ok(Self {
			client,
			root: resource_root(&config.base_url, &config.api_prefix)?,
			credentials,
			long_poll_timeout: config.long_poll_timeout(),
		})
	}

	/// Root every resource path is resolved against, always ending in `/`.
	pub fn root(&self) -> &Url {
		&self.root
	}

	fn url(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<Url> {
		let mut url = self.root.join(path)?;
		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query);
		}
		Ok(url)
	}

	fn request(&self, method: Method, url: Url) -> RequestBuilder {
		debug!(target = "fsched.api", method = %method, url = %url, "request");
		self.client
			.request(method, url)
			.basic_auth(&self.credentials.principal, Some(&self.credentials.token))
			.header(ACCEPT, MEDIA_TYPE)
	}

	fn with_body<T: Serialize>(builder: RequestBuilder, body: &T, resource: &str) -> ApiResult<RequestBuilder> {
		let body = serde_json::to_vec(body).map_err(decode_error(resource))?;
		Ok(builder.header(CONTENT_TYPE, MEDIA_TYPE).body(body))
	}

	async fn get<T: DeserializeOwned>(&self, url: Url, resource: &str, timeout: Option<Duration>) -> ApiResult<T> {
		let mut builder = self.request(Method::GET, url);
		if let Some(timeout) = timeout {
			builder = builder.timeout(timeout);
		}
		parse(send(builder, resource).await?, resource).await
	}
}

#[async_trait]
impl SchedulerApi for HttpSchedulerApi {
	async fn create_job(&self, request: &JobRequest) -> ApiResult<Job> {
		let attributes = JobAttributes {
			min_nodes: request.min_nodes.clone(),
			script: request.script.clone(),
			script_name: request.script_name.clone(),
			arguments: request.arguments.clone(),
			..Default::default()
		};
		let body = Document::new(ResourceObject::new(JOB_TYPE, attributes));

		let url = self.url("jobs", &[("include", JOB_INCLUDES)])?;
		let builder = Self::with_body(self.request(Method::POST, url), &body, "job")?;
		let doc: Document<ResourceObject<JobAttributes>> = parse(send(builder, "job").await?, "job").await?;
		let (data, side) = split(doc);
		decode::job(data, &side).map_err(decode_error("job"))
	}

	async fn fetch_job(&self, id: &str, long_poll: bool) -> ApiResult<Job> {
		let resource = format!("job {id}");
		let mut query = vec![("include", JOB_INCLUDES)];
		if long_poll {
			query.push(("long_poll_runnable", "true"));
		}

		let url = self.url(&format!("jobs/{id}"), &query)?;
		let timeout = long_poll.then_some(self.long_poll_timeout);
		let doc: Document<ResourceObject<JobAttributes>> = self.get(url, &resource, timeout).await?;
		let (data, side) = split(doc);
		decode::job(data, &side).map_err(decode_error(&resource))
	}

	async fn delete_job(&self, id: &str) -> ApiResult<()> {
		let resource = format!("job {id}");
		let url = self.url(&format!("jobs/{id}"), &[])?;
		send(self.request(Method::DELETE, url), &resource).await?;
		Ok(())
	}

	async fn list_jobs(&self) -> ApiResult<Vec<Job>> {
		let url = self.url("jobs", &[("include", JOB_INCLUDES)])?;
		let doc: Document<Vec<ResourceObject<JobAttributes>>> = self.get(url, "jobs", None).await?;
		let (data, side) = split(doc);
		data.into_iter()
			.map(|resource| decode::job(resource, &side))
			.collect::<serde_json::Result<Vec<_>>>()
			.map_err(decode_error("jobs"))
	}

	async fn create_job_step(&self, request: &JobStepRequest) -> ApiResult<JobStep> {
		let resource = format!("job step for job {}", request.job_id);
		let attributes = JobStepAttributes {
			arguments: request.arguments.clone(),
			path: request.path.clone(),
			pty: request.pty,
			environment: request.environment.clone(),
			..Default::default()
		};
		let body = Document::new(
			ResourceObject::new(JOB_STEP_TYPE, attributes)
				.with_relationship("job", Linkage::One(ResourceIdentifier::new(JOB_TYPE, request.job_id.clone()))),
		);

		let url = self.url("job-steps", &[("include", JOB_STEP_INCLUDES)])?;
		let builder = Self::with_body(self.request(Method::POST, url), &body, &resource)?;
		let doc: Document<ResourceObject<JobStepAttributes>> = parse(send(builder, &resource).await?, &resource).await?;
		let (data, side) = split(doc);
		decode::job_step(data, &side, &request.job_id).map_err(decode_error(&resource))
	}

	async fn fetch_job_step(&self, job_id: &str, step_id: &str, long_poll: bool) -> ApiResult<JobStep> {
		let resource = format!("job step {job_id}.{step_id}");
		let mut query = vec![("include", JOB_STEP_INCLUDES)];
		if long_poll {
			query.push(("long_poll_submitted", "true"));
		}

		let url = self.url(&format!("job-steps/{job_id}.{step_id}"), &query)?;
		let timeout = long_poll.then_some(self.long_poll_timeout);
		let doc: Document<ResourceObject<JobStepAttributes>> = self.get(url, &resource, timeout).await?;
		let (data, side) = split(doc);
		decode::job_step(data, &side, job_id).map_err(decode_error(&resource))
	}

	async fn list_partitions(&self) -> ApiResult<Vec<Partition>> {
		let url = self.url(PARTITION_TYPE, &[("include", PARTITION_INCLUDES)])?;
		let doc: Document<Vec<ResourceObject<PartitionAttributes>>> = self.get(url, "partitions", None).await?;
		let (data, side) = split(doc);
		data.into_iter()
			.map(|resource| decode::partition(resource, &side))
			.collect::<serde_json::Result<Vec<_>>>()
			.map_err(decode_error("partitions"))
	}
}

/// `{base}/{prefix}/` with exactly one slash between segments.
fn resource_root(base_url: &str, prefix: &str) -> ApiResult<Url> {
	let mut url = Url::parse(base_url)?;
	let mut path = url.path().trim_end_matches('/').to_string();
	let prefix = prefix.trim_matches('/');
	if !prefix.is_empty() {
		path.push('/');
		path.push_str(prefix);
	}
	path.push('/');
	url.set_path(&path);
	Ok(url)
}

async fn send(builder: RequestBuilder, resource: &str) -> ApiResult<Response> {
	let response = builder.send().await.map_err(ApiError::Connection)?;
	let status = response.status();
	debug!(target = "fsched.api", status = status.as_u16(), resource, "response");

	if status == StatusCode::NOT_FOUND {
		return Err(ApiError::NotFound {
			resource: resource.to_string(),
		});
	}
	if !status.is_success() {
		let body = response.bytes().await.unwrap_or_default();
		let message = serde_json::from_slice::<ErrorDocument>(&body)
			.ok()
			.and_then(|doc| doc.message())
			.unwrap_or_else(|| status.canonical_reason().unwrap_or("unexpected status").to_string());
		return Err(ApiError::Status {
			status: status.as_u16(),
			message,
		});
	}
	Ok(response)
}

async fn parse<T: DeserializeOwned>(response: Response, resource: &str) -> ApiResult<T> {
	let body = response.bytes().await.map_err(ApiError::Connection)?;
	serde_json::from_slice(&body).map_err(decode_error(resource))
}

fn decode_error(resource: &str) -> impl Fn(serde_json::Error) -> ApiError + '_ {
	move |err| ApiError::Decode {
		resource: resource.to_string(),
		message: err.to_string(),
	}
}

/// Separates primary data from the side-loaded resources it refers to.
fn split<D>(doc: Document<D>) -> (D, Document<()>) {
	let Document { data, included } = doc;
	(data, Document { data: (), included })
}
