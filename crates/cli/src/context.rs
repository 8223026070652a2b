//! Everything a command needs, built once in `main` and passed down.

use std::sync::Arc;

use fsched_runtime::BridgeConfig;

use crate::api::SchedulerApi;
use crate::config::Config;
use crate::output::OutputFormat;

pub struct CommandContext {
	pub config: Config,
	pub api: Arc<dyn SchedulerApi>,
	pub format: OutputFormat,
	pub runtime: BridgeConfig,
}

impl CommandContext {
	pub fn new(config: Config, api: Arc<dyn SchedulerApi>, format: OutputFormat, verbose: u8) -> Self {
		let runtime = config.runtime(verbose >= 2);
		Self {
			config,
			api,
			format,
			runtime,
		}
	}
}
