//! Client configuration.
//!
//! Loaded once at process start and passed down explicitly. Every key is
//! optional; a missing file means defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fsched_runtime::BridgeConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::AuthType;
use crate::error::{CliError, Result};

pub const CONFIG_ENV: &str = "FSCHED_CONFIG";
const CONFIG_DIR: &str = "flight-scheduler";
const CONFIG_FILE: &str = "config.json";

/// Which bridge `connect` uses to reach an interactive job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachTransport {
	/// Submit a pseudo-terminal job step and stream directly to its stepd.
	#[default]
	Direct,
	/// Go through the controller's interactive relay.
	Relay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	pub base_url: String,
	pub api_prefix: String,
	pub auth_type: AuthType,
	/// `fatal`, `error`, `warn`, `info`, `debug` or `disabled`.
	pub log_level: String,
	pub log_path: Option<PathBuf>,
	pub poll_interval_ms: u64,
	pub request_timeout_secs: u64,
	pub long_poll_timeout_secs: u64,
	pub attach_transport: AttachTransport,
	pub relay_address: String,
	pub batch_comment_prefix: String,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			base_url: "http://localhost:6307".to_string(),
			api_prefix: "v0".to_string(),
			auth_type: AuthType::Basic,
			log_level: "warn".to_string(),
			log_path: None,
			poll_interval_ms: 1000,
			request_timeout_secs: 30,
			long_poll_timeout_secs: 120,
			attach_transport: AttachTransport::Direct,
			relay_address: "localhost:6308".to_string(),
			batch_comment_prefix: "FSCHED".to_string(),
		}
	}
}

impl Config {
	/// Loads from `explicit`, then `$FSCHED_CONFIG`, then the user config directory.
	pub fn load(explicit: Option<&Path>) -> Result<Self> {
		let path = match explicit {
			Some(path) => Some(path.to_path_buf()),
			None => std::env::var_os(CONFIG_ENV)
				.filter(|value| !value.is_empty())
				.map(PathBuf::from)
				.or_else(default_path),
		};

		match path {
			Some(path) => Self::load_from(&path),
			None => Ok(Self::default()),
		}
	}

	pub fn load_from(path: &Path) -> Result<Self> {
		let data = match std::fs::read_to_string(path) {
			Ok(data) => data,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				debug!(target = "fsched.config", path = %path.display(), "missing config, using defaults");
				return Ok(Self::default());
			}
			Err(err) => return Err(err.into()),
		};

		let config: Self = serde_json::from_str(&data).map_err(|err| CliError::InvalidInput(format!("invalid config {}: {err}", path.display())))?;
		debug!(target = "fsched.config", path = %path.display(), "loaded config");
		Ok(config)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}

	pub fn long_poll_timeout(&self) -> Duration {
		Duration::from_secs(self.long_poll_timeout_secs.max(self.request_timeout_secs))
	}

	/// Runtime settings for the streaming components.
	///
	/// Expected stream terminations are only traced when `debug_streams` is set.
	pub fn runtime(&self, debug_streams: bool) -> BridgeConfig {
		BridgeConfig::default()
			.with_poll_interval(self.poll_interval())
			.with_stream_diagnostics(debug_streams || self.log_level == "debug")
	}
}

fn default_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}
