use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

struct Outcome {
	code: Option<i32>,
	stdout: String,
	stderr: String,
}

fn fsched_binary() -> PathBuf {
	PathBuf::from(env!("CARGO_BIN_EXE_fsched"))
}

/// Runs `fsched` with a private config file and no job id in the environment.
fn run_fsched(workdir: &Path, config: Option<serde_json::Value>, args: &[&str]) -> Outcome {
	let config_path = workdir.join("config.json");
	if let Some(config) = config {
		std::fs::write(&config_path, config.to_string()).expect("config should be written");
	}

	let output = Command::new(fsched_binary())
		.current_dir(workdir)
		.args(args)
		.env("FSCHED_CONFIG", &config_path)
		.env("USER", "tester")
		.env_remove("FLIGHT_JOB_ID")
		.env_remove("JOB_ID")
		.env_remove("RUST_LOG")
		.output()
		.expect("failed to execute fsched");

	Outcome {
		code: output.status.code(),
		stdout: String::from_utf8_lossy(&output.stdout).to_string(),
		stderr: String::from_utf8_lossy(&output.stderr).to_string(),
	}
}

fn mentions(stderr: &str, needle: &str) -> usize {
	stderr.lines().filter(|line| line.contains(needle)).count()
}

fn closed_port_url() -> String {
	let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
	let port = listener.local_addr().unwrap().port();
	drop(listener);
	format!("http://127.0.0.1:{port}")
}

#[test]
fn run_without_job_id_is_invalid_input() {
	let dir = TempDir::new().unwrap();
	let outcome = run_fsched(dir.path(), None, &["run", "hostname"]);

	assert_eq!(outcome.code, Some(2));
	assert!(outcome.stderr.contains("Error: --jobid must be given"), "stderr: {}", outcome.stderr);
	assert_eq!(mentions(&outcome.stderr, "--jobid must be given"), 1, "stderr: {}", outcome.stderr);
	assert!(outcome.stdout.is_empty());
}

#[test]
fn structured_formats_report_failures_on_stdout() {
	let dir = TempDir::new().unwrap();
	let outcome = run_fsched(dir.path(), None, &["--format", "json", "connect"]);

	assert_eq!(outcome.code, Some(2));
	let value: serde_json::Value = serde_json::from_str(&outcome.stdout).expect("stdout should be JSON");
	assert_eq!(value["ok"], false);
	assert_eq!(value["command"], "connect");
	assert_eq!(value["error"]["code"], 2);
}

#[test]
fn unknown_subcommand_exits_127() {
	let dir = TempDir::new().unwrap();
	let outcome = run_fsched(dir.path(), None, &["launch-rockets"]);

	assert_eq!(outcome.code, Some(127));
	assert!(outcome.stderr.contains("launch-rockets"));
}

#[test]
fn batch_reports_missing_scripts() {
	let dir = TempDir::new().unwrap();
	let outcome = run_fsched(dir.path(), None, &["batch", "./absent.sh"]);

	assert_eq!(outcome.code, Some(2));
	assert!(outcome.stderr.contains("Could not locate:"), "stderr: {}", outcome.stderr);
	assert!(outcome.stderr.contains("absent.sh"));
}

#[test]
fn batch_rejects_scripts_without_shebang() {
	let dir = TempDir::new().unwrap();
	std::fs::write(dir.path().join("plain.sh"), "hostname\n").unwrap();
	let outcome = run_fsched(dir.path(), None, &["batch", "plain.sh"]);

	assert_eq!(outcome.code, Some(2));
	assert!(outcome.stderr.contains("does not look like a batch script"));
}

#[test]
fn unreachable_api_exits_3() {
	let dir = TempDir::new().unwrap();
	let config = serde_json::json!({"base_url": closed_port_url(), "request_timeout_secs": 5});
	let outcome = run_fsched(dir.path(), Some(config), &["queue"]);

	assert_eq!(outcome.code, Some(3));
	assert!(outcome.stderr.contains("Unable to connect to the Flight Scheduler API"), "stderr: {}", outcome.stderr);
	assert_eq!(mentions(&outcome.stderr, "Unable to connect"), 1, "stderr: {}", outcome.stderr);
}

#[test]
fn malformed_config_is_invalid_input() {
	let dir = TempDir::new().unwrap();
	std::fs::write(dir.path().join("config.json"), "{ broken").unwrap();
	let outcome = run_fsched(dir.path(), None, &["info"]);

	assert_eq!(outcome.code, Some(2));
	assert!(outcome.stderr.contains("invalid config"));
}
