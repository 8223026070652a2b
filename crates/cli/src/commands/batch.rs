//! `fsched batch`: submit a script as a new job.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use regex_lite::Regex;
use tracing::debug;

use crate::api::JobRequest;
use crate::context::CommandContext;
use crate::error::{CliError, Result};
use crate::output::{CommandResult, SubmittedJob, print_result};

const NODES_PATTERN: &str = r"^\d+[km]?$";

/// Options that may also be given on `#<prefix> ` lines inside the script.
#[derive(Parser, Debug, Default, PartialEq, Eq)]
#[command(no_binary_name = true, disable_help_flag = true, disable_version_flag = true)]
struct Directives {
	#[arg(short = 'N', long)]
	nodes: Option<String>,
}

pub(super) async fn execute(ctx: &CommandContext, nodes: Option<String>, script: &str, args: Vec<String>) -> Result<i32> {
	let cwd = std::env::current_dir()?;
	let path = resolve_script(script, &cwd, std::env::var_os("PATH"))?;
	let content = tokio::fs::read_to_string(&path).await?;
	ensure_shebang(&content)?;

	let directives = parse_directives(&content, &ctx.config.batch_comment_prefix)?;
	let min_nodes = validate_nodes(nodes.or(directives.nodes).unwrap_or_else(|| "1".to_string()))?;
	let script_name = path
		.file_name()
		.map(|name| name.to_string_lossy().into_owned())
		.unwrap_or_else(|| script.to_string());
	debug!(target = "fsched.batch", path = %path.display(), min_nodes = %min_nodes, "submitting batch script");

	let job = ctx
		.api
		.create_job(&JobRequest {
			min_nodes: Some(min_nodes),
			script: Some(content),
			script_name: Some(script_name.clone()),
			arguments: args,
		})
		.await?;

	let submitted = SubmittedJob { job_id: job.id, script_name };
	print_result(&CommandResult::success("batch", submitted), ctx.format, |job| format!("Submitted batch job {}\n", job.job_id));
	Ok(0)
}

/// Node counts are a number with an optional `k` or `m` suffix.
pub(super) fn validate_nodes(nodes: String) -> Result<String> {
	let pattern = Regex::new(NODES_PATTERN).map_err(|err| CliError::General(err.to_string()))?;
	if pattern.is_match(&nodes) {
		Ok(nodes)
	} else {
		Err(CliError::InvalidInput(format!(
			"Unrecognized number syntax: {nodes}\nIt should be a number with an optional k or m suffix."
		)))
	}
}

fn ensure_shebang(content: &str) -> Result<()> {
	if content.starts_with("#!") {
		return Ok(());
	}
	Err(CliError::InvalidInput(format!(
		"This does not look like a batch script!\nThe first line must start with #! followed by the interpreter path.\nFor instance: {}",
		"#!/bin/bash".yellow()
	)))
}

/// Absolute or `.`-relative paths must exist as given; other names are tried
/// against `cwd` and then each absolute `PATH` entry.
fn resolve_script(script: &str, cwd: &Path, path_var: Option<OsString>) -> Result<PathBuf> {
	let candidate = Path::new(script);
	if candidate.is_absolute() || script.starts_with('.') {
		let path = cwd.join(candidate);
		return if path.is_file() { Ok(path) } else { Err(CliError::Missing(path)) };
	}

	let local = cwd.join(candidate);
	if local.is_file() {
		return Ok(local);
	}

	path_var
		.iter()
		.flat_map(std::env::split_paths)
		.filter(|root| root.is_absolute())
		.map(|root| root.join(candidate))
		.find(|path| path.is_file())
		.ok_or_else(|| CliError::Missing(PathBuf::from(script)))
}

fn parse_directives(content: &str, prefix: &str) -> Result<Directives> {
	let pattern = Regex::new(&format!(r"^#{}\s(.*)$", regex_lite::escape(prefix))).map_err(|err| CliError::General(err.to_string()))?;
	let tokens: Vec<&str> = content
		.lines()
		.filter_map(|line| pattern.captures(line))
		.filter_map(|captures| captures.get(1))
		.flat_map(|args| args.as_str().split_whitespace())
		.collect();

	Directives::try_parse_from(tokens).map_err(|err| {
		let message = err.to_string();
		let first = message.lines().next().unwrap_or_default().trim_start_matches("error: ");
		CliError::InvalidInput(format!("invalid #{prefix} directive: {first}"))
	})
}
