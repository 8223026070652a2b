//! `fsched info`: partitions and the state of their nodes.

use fsched_protocol::Partition;

use crate::context::CommandContext;
use crate::error::Result;
use crate::output::{CommandResult, PartitionSummary, Table, print_result};

const MISSING: &str = "MISSING";

pub(super) async fn execute(ctx: &CommandContext) -> Result<i32> {
	let partitions = ctx.api.list_partitions().await?;
	if partitions.is_empty() && !ctx.format.is_structured() {
		eprintln!("(none)");
		return Ok(0);
	}

	let rows = summarize(&partitions);
	print_result(&CommandResult::success("info", rows), ctx.format, |rows| render(rows));
	Ok(0)
}

/// One row per (partition, node state), states in first-seen order.
fn summarize(partitions: &[Partition]) -> Vec<PartitionSummary> {
	let mut rows = Vec::new();
	for partition in partitions {
		let row = |state: &str, node_list: Vec<String>| PartitionSummary {
			partition: partition.name.clone(),
			avail: "up".to_string(),
			time_limit: time_limit(partition.max_time_limit),
			nodes: node_list.len(),
			state: state.to_string(),
			node_list,
		};

		if partition.nodes.is_empty() {
			rows.push(row(MISSING, Vec::new()));
			continue;
		}

		let mut groups: Vec<(&str, Vec<String>)> = Vec::new();
		for node in &partition.nodes {
			match groups.iter_mut().find(|(state, _)| *state == node.state) {
				Some((_, names)) => names.push(node.name.clone()),
				None => groups.push((node.state.as_str(), vec![node.name.clone()])),
			}
		}
		rows.extend(groups.into_iter().map(|(state, names)| row(state, names)));
	}
	rows
}

fn render(rows: &[PartitionSummary]) -> String {
	let mut table = Table::new(["PARTITION", "AVAIL", "TIMELIMIT", "NODES", "STATE", "NODELIST"]);
	for row in rows {
		table.push(vec![
			row.partition.clone(),
			row.avail.clone(),
			row.time_limit.clone(),
			row.nodes.to_string(),
			row.state.to_lowercase(),
			row.node_list.join(","),
		]);
	}
	table.render()
}

/// `infinite`, `M:SS`, `H:MM:SS` or `D-HH:MM:SS`.
fn time_limit(seconds: Option<u64>) -> String {
	let Some(total) = seconds else {
		return "infinite".to_string();
	};
	let (days, rest) = (total / 86_400, total % 86_400);
	let (hours, minutes, secs) = (rest / 3600, rest % 3600 / 60, rest % 60);
	match (days, hours) {
		(0, 0) => format!("{minutes}:{secs:02}"),
		(0, _) => format!("{hours}:{minutes:02}:{secs:02}"),
		_ => format!("{days}-{hours:02}:{minutes:02}:{secs:02}"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::commands::testing::{FakeApi, context};
	use fsched_protocol::Node;

	fn node(name: &str, state: &str) -> Node {
		Node {
			name: name.into(),
			state: state.into(),
			..Default::default()
		}
	}

	fn partitions() -> Vec<Partition> {
		vec![
			Partition {
				name: "standard".into(),
				max_time_limit: Some(3600),
				nodes: vec![node("node01", "IDLE"), node("node02", "ALLOC"), node("node03", "IDLE")],
			},
			Partition {
				name: "empty".into(),
				max_time_limit: None,
				nodes: vec![],
			},
		]
	}

	#[test]
	fn nodes_group_by_state_within_each_partition() {
		let rows = summarize(&partitions());

		assert_eq!(rows.len(), 3);
		assert_eq!(rows[0].state, "IDLE");
		assert_eq!(rows[0].node_list, vec!["node01".to_string(), "node03".to_string()]);
		assert_eq!(rows[0].nodes, 2);
		assert_eq!(rows[1].state, "ALLOC");
		assert_eq!(rows[2].partition, "empty");
		assert_eq!(rows[2].state, MISSING);
		assert_eq!(rows[2].nodes, 0);
	}

	#[test]
	fn table_uses_the_default_columns() {
		let text = render(&summarize(&partitions()));
		let lines: Vec<&str> = text.lines().collect();

		assert_eq!(lines[0], "PARTITION AVAIL TIMELIMIT NODES STATE   NODELIST");
		assert_eq!(lines[1], "standard  up    1:00:00   2     idle    node01,node03");
		assert_eq!(lines[3], "empty     up    infinite  0     missing");
	}

	#[test]
	fn time_limits_render_like_slurm() {
		assert_eq!(time_limit(None), "infinite");
		assert_eq!(time_limit(Some(90)), "1:30");
		assert_eq!(time_limit(Some(7_200)), "2:00:00");
		assert_eq!(time_limit(Some(3 * 86_400 + 3_661)), "3-01:01:01");
	}

	#[tokio::test]
	async fn empty_listing_still_succeeds() {
		let (ctx, _) = context(FakeApi::default());
		assert_eq!(execute(&ctx).await.unwrap(), 0);
	}
}
