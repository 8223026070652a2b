//! Tracing subscriber setup.

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Logging destination and level, resolved from config and `-v` flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
	pub level: String,
	pub path: Option<PathBuf>,
}

impl LogSettings {
	pub fn new(level: impl Into<String>, path: Option<PathBuf>) -> Self {
		Self { level: level.into(), path }
	}

	/// Filter directive for the `fsched*` targets, or `None` when disabled.
	pub fn directive(&self, verbose: u8) -> Option<String> {
		let level = match verbose {
			0 => match self.level.as_str() {
				"disabled" => return None,
				"fatal" | "error" => "error",
				"warn" => "warn",
				"info" => "info",
				"debug" => "debug",
				"trace" => "trace",
				_ => "error",
			},
			1 => "info",
			_ => "debug",
		};
		Some(format!("fsched={level},warn"))
	}

	pub fn is_recognised(&self) -> bool {
		matches!(self.level.as_str(), "disabled" | "fatal" | "error" | "warn" | "info" | "debug" | "trace")
	}
}

/// Installs the global subscriber. `RUST_LOG` overrides everything else.
///
/// Logs go to stderr (or `path`) so they never mix with relayed job output.
pub fn init_logging(verbose: u8, settings: &LogSettings) {
	let from_env = std::env::var("RUST_LOG").ok().filter(|value| !value.is_empty());
	let directive = match (from_env, settings.directive(verbose)) {
		(Some(env), _) => env,
		(None, Some(directive)) => directive,
		(None, None) => return,
	};
	let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

	let file = settings.path.as_ref().and_then(|path| {
		if let Some(parent) = path.parent() {
			let _ = std::fs::create_dir_all(parent);
		}
		std::fs::OpenOptions::new().create(true).append(true).open(path).ok()
	});

	let installed = match file {
		Some(file) => tracing_subscriber::registry()
			.with(fmt::layer().with_ansi(false).with_writer(std::sync::Mutex::new(file)))
			.with(filter)
			.try_init(),
		None => tracing_subscriber::registry()
			.with(fmt::layer().with_writer(std::io::stderr))
			.with(filter)
			.try_init(),
	};

	if installed.is_ok() && !settings.is_recognised() {
		tracing::error!(target = "fsched", level = %settings.level, "unrecognised log level");
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn verbosity_overrides_config_level() {
		let settings = LogSettings::new("warn", None);
		assert_eq!(settings.directive(0).unwrap(), "fsched=warn,warn");
		assert!(settings.directive(1).unwrap().starts_with("fsched=info"));
		assert!(settings.directive(2).unwrap().starts_with("fsched=debug"));
	}

	#[test]
	fn disabled_installs_nothing_unless_verbose() {
		let settings = LogSettings::new("disabled", None);
		assert!(settings.directive(0).is_none());
		assert!(settings.directive(1).is_some());
	}

	#[test]
	fn unknown_levels_fall_back_to_error() {
		let settings = LogSettings::new("chatty", None);
		assert!(!settings.is_recognised());
		assert!(settings.directive(0).unwrap().starts_with("fsched=error"));
		assert!(LogSettings::new("fatal", None).directive(0).unwrap().starts_with("fsched=error"));
	}
}
