//! `fsched queue`: jobs known to the scheduler.

use fsched_protocol::{Job, JobState};

use crate::context::CommandContext;
use crate::error::Result;
use crate::output::{CommandResult, QueueEntry, Table, print_result};

pub(super) async fn execute(ctx: &CommandContext) -> Result<i32> {
	let jobs = ctx.api.list_jobs().await?;
	let entries = entries(&jobs);
	print_result(&CommandResult::success("queue", entries), ctx.format, |entries| render(entries));
	Ok(0)
}

/// Every job, followed by the running tasks of array jobs.
fn entries(jobs: &[Job]) -> Vec<QueueEntry> {
	let mut entries = Vec::new();
	for job in jobs {
		let partition = job.partition.clone().unwrap_or_default();
		let name = job.script_name.clone().unwrap_or_default();

		match job.array_range {
			Some((next, last)) => {
				entries.push(QueueEntry {
					job_id: format!("{}[{next}-{last}]", job.id),
					partition: partition.clone(),
					name: name.clone(),
					state: state_code(job.state).to_string(),
					nodes: None,
					reason: job.reason.clone(),
					node_list: job.allocated_nodes.clone(),
				});
				entries.extend(job.running_tasks.iter().map(|task| QueueEntry {
					job_id: format!("{}[{}]", job.id, task.index),
					partition: partition.clone(),
					name: name.clone(),
					state: state_code(task.state).to_string(),
					nodes: Some(task.allocated_nodes.len().to_string()),
					reason: None,
					node_list: task.allocated_nodes.clone(),
				}));
			}
			None => entries.push(QueueEntry {
				job_id: job.id.clone(),
				partition,
				name,
				state: state_code(job.state).to_string(),
				nodes: job.min_nodes.clone(),
				reason: job.reason.clone(),
				node_list: job.allocated_nodes.clone(),
			}),
		}
	}
	entries
}

fn render(entries: &[QueueEntry]) -> String {
	let mut table = Table::new(["JOBID", "PARTITION", "NAME", "ST", "NODES", "NODELIST(REASON)"]);
	for entry in entries {
		table.push(vec![
			entry.job_id.clone(),
			entry.partition.clone(),
			entry.name.clone(),
			entry.state.clone(),
			entry.nodes.clone().unwrap_or_default(),
			node_list(entry),
		]);
	}
	table.render()
}

fn node_list(entry: &QueueEntry) -> String {
	let nodes = entry.node_list.join(",");
	match &entry.reason {
		Some(reason) if nodes.is_empty() => format!("({reason})"),
		Some(reason) => format!("{nodes} ({reason})"),
		None => nodes,
	}
}

fn state_code(state: JobState) -> &'static str {
	match state {
		JobState::Pending => "PD",
		JobState::Configuring => "CF",
		JobState::Running => "R",
		JobState::Cancelling | JobState::Completing => "CG",
		JobState::Cancelled => "CA",
		JobState::Completed => "CD",
		JobState::Failed => "F",
		JobState::Timeout => "TO",
		JobState::Unknown => "?",
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::commands::testing::job;
	use fsched_protocol::Task;

	fn jobs() -> Vec<Job> {
		let mut running = job("7", JobState::Running);
		running.partition = Some("standard".into());
		running.script_name = Some("train.sh".into());
		running.allocated_nodes = vec!["node01".into(), "node02".into()];
		running.min_nodes = Some("2".into());

		let mut pending = job("8", JobState::Pending);
		pending.reason = Some("Resources".into());

		let mut array = job("9", JobState::Running);
		array.array_range = Some((4, 10));
		array.running_tasks = vec![Task {
			index: 3,
			state: JobState::Running,
			allocated_nodes: vec!["node03".into()],
		}];

		vec![running, pending, array]
	}

	#[test]
	fn array_jobs_list_their_running_tasks() {
		let entries = entries(&jobs());
		let ids: Vec<&str> = entries.iter().map(|entry| entry.job_id.as_str()).collect();

		assert_eq!(ids, vec!["7", "8", "9[4-10]", "9[3]"]);
		assert_eq!(entries[2].nodes, None);
		assert_eq!(entries[3].node_list, vec!["node03".to_string()]);
	}

	#[test]
	fn reasons_follow_the_node_list() {
		let entries = entries(&jobs());
		assert_eq!(node_list(&entries[0]), "node01,node02");
		assert_eq!(node_list(&entries[1]), "(Resources)");

		let mut both = entries[0].clone();
		both.reason = Some("Prolog".into());
		assert_eq!(node_list(&both), "node01,node02 (Prolog)");
	}

	#[test]
	fn table_rows_use_short_state_codes() {
		let text = render(&entries(&jobs()));
		let lines: Vec<&str> = text.lines().collect();

		assert_eq!(lines[0], "JOBID   PARTITION NAME     ST NODES NODELIST(REASON)");
		assert_eq!(lines[1], "7       standard  train.sh R  2     node01,node02");
		assert_eq!(lines[2], "8                          PD 1     (Resources)");
	}
}
