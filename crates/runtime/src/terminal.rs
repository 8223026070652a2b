//! Local terminal handling for interactive sessions.

use std::collections::BTreeMap;

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::{debug, error, warn};

/// Puts the local terminal into raw mode for its lifetime.
///
/// Raw mode disables line editing and signal translation, so keystrokes such
/// as Ctrl-C reach the remote pseudo-terminal as bytes.
pub struct RawModeGuard(bool);

impl RawModeGuard {
	pub fn new(enable: bool) -> Self {
		if !enable {
			return Self(false);
		}
		match enable_raw_mode() {
			Ok(()) => {
				debug!(target = "fsched.terminal", "raw mode enabled");
				Self(true)
			}
			Err(err) => {
				warn!(target = "fsched.terminal", error = %err, "failed to enable raw mode");
				Self(false)
			}
		}
	}

	pub fn is_active(&self) -> bool {
		self.0
	}
}

impl Drop for RawModeGuard {
	fn drop(&mut self) {
		if self.0 {
			if let Err(err) = disable_raw_mode() {
				warn!(target = "fsched.terminal", error = %err, "failed to restore terminal mode");
			}
		}
	}
}

/// Terminal size as `(columns, lines)`, if stdout is attached to a terminal.
pub fn dimensions() -> Option<(u16, u16)> {
	crossterm::terminal::size().ok().filter(|(columns, lines)| *columns > 0 && *lines > 0)
}

/// Environment forwarded to a remote pseudo-terminal: `TERM`, `COLUMNS`, `LINES`.
pub fn pty_environment() -> BTreeMap<String, String> {
	let mut env = BTreeMap::new();
	if let Ok(term) = std::env::var("TERM") {
		env.insert("TERM".to_string(), term);
	}
	if let Some((columns, lines)) = dimensions() {
		env.insert("COLUMNS".to_string(), columns.to_string());
		env.insert("LINES".to_string(), lines.to_string());
	}
	env
}

/// Resolves when the user interrupts the process (Ctrl-C / SIGINT).
///
/// Never resolves if the signal handler cannot be installed.
pub async fn interrupted() {
	match tokio::signal::ctrl_c().await {
		Ok(()) => debug!(target = "fsched.terminal", "interrupt received"),
		Err(err) => {
			error!(target = "fsched.terminal", error = %err, "failed to listen for Ctrl-C");
			std::future::pending::<()>().await;
		}
	}
}
