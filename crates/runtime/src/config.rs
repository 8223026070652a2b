use std::time::Duration;

/// Runtime knobs, built once at process start and passed to each component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
	/// Minimum spacing between consecutive long-poll fetches.
	pub poll_interval: Duration,
	/// Log expected stream terminations (resets, broken pipes) at debug level.
	pub stream_diagnostics: bool,
	/// Capacity of each connection's input queue, in chunks.
	pub input_queue_depth: usize,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			poll_interval: Duration::from_secs(1),
			stream_diagnostics: false,
			input_queue_depth: 64,
		}
	}
}

impl BridgeConfig {
	pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
		self.poll_interval = poll_interval;
		self
	}

	pub fn with_stream_diagnostics(mut self, enabled: bool) -> Self {
		self.stream_diagnostics = enabled;
		self
	}
}
