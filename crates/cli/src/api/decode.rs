//! Assembles records from JSON:API documents.

use fsched_protocol::{
	Document, Environment, Execution, ExecutionAttributes, Job, JobAttributes, JobStep, JobStepAttributes, Node, Partition, PartitionAttributes,
	ResourceIdentifier, ResourceObject, Task, TaskAttributes,
};

pub(super) type Resource<A> = ResourceObject<A>;

/// Job step plus the executions side-loaded with it.
pub(super) fn job_step<D>(resource: Resource<JobStepAttributes>, doc: &Document<D>, job_id: &str) -> serde_json::Result<JobStep> {
	let executions = doc
		.collect_included::<ExecutionAttributes, _>(resource.related("executions"))?
		.into_iter()
		.map(|execution| Execution {
			id: execution.id_or_default(),
			node: execution.attributes.node,
			port: execution.attributes.port,
			state: execution.attributes.state,
		})
		.collect();
	let job_id = resource.related("job").first().map_or_else(|| job_id.to_string(), |ident| ident.id.clone());

	Ok(JobStep {
		id: resource.id_or_default(),
		job_id,
		arguments: resource.attributes.arguments,
		path: resource.attributes.path,
		pty: resource.attributes.pty,
		submitted: resource.attributes.submitted,
		executions,
	})
}

pub(super) fn job<D>(resource: Resource<JobAttributes>, doc: &Document<D>) -> serde_json::Result<Job> {
	let partition = match resource.related("partition").first() {
		Some(ident) => Some(match doc.find_included::<PartitionAttributes>(ident).transpose()? {
			Some(partition) if !partition.attributes.name.is_empty() => partition.attributes.name,
			_ => ident.id.clone(),
		}),
		None => None,
	};
	let environment = match resource.related("shared-environment").first() {
		Some(ident) => doc.find_included::<Environment>(ident).transpose()?.map(|env| env.attributes),
		None => None,
	};
	let running_tasks = doc
		.collect_included::<TaskAttributes, _>(resource.related("running-tasks"))?
		.into_iter()
		.map(|task| -> serde_json::Result<Task> {
			Ok(Task {
				index: task.attributes.index,
				state: task.attributes.state,
				allocated_nodes: node_names(doc, task.related("allocated-nodes"))?,
			})
		})
		.collect::<serde_json::Result<Vec<_>>>()?;
	let allocated_nodes = node_names(doc, resource.related("allocated-nodes"))?;
	let attributes = resource.attributes;
	let array_range = attributes.last_index.map(|last| (attributes.next_index.unwrap_or(0), last));

	Ok(Job {
		id: resource.id.unwrap_or_default(),
		state: attributes.state,
		reason: attributes.reason,
		runnable: attributes.runnable,
		min_nodes: attributes.min_nodes,
		script_name: attributes.script_name,
		partition,
		allocated_nodes,
		environment,
		array_range,
		running_tasks,
	})
}

pub(super) fn partition<D>(resource: Resource<PartitionAttributes>, doc: &Document<D>) -> serde_json::Result<Partition> {
	let nodes = resource
		.related("nodes")
		.into_iter()
		.map(|ident| node(doc, ident))
		.collect::<serde_json::Result<Vec<_>>>()?;
	let name = if resource.attributes.name.is_empty() {
		resource.id_or_default()
	} else {
		resource.attributes.name
	};

	Ok(Partition {
		name,
		max_time_limit: resource.attributes.max_time_limit,
		nodes,
	})
}

fn node<D>(doc: &Document<D>, ident: &ResourceIdentifier) -> serde_json::Result<Node> {
	let mut node = doc.find_included::<Node>(ident).transpose()?.map(|node| node.attributes).unwrap_or_default();
	if node.name.is_empty() {
		node.name = ident.id.clone();
	}
	Ok(node)
}

fn node_names<D>(doc: &Document<D>, idents: Vec<&ResourceIdentifier>) -> serde_json::Result<Vec<String>> {
	idents.into_iter().map(|ident| node(doc, ident).map(|node| node.name)).collect()
}
