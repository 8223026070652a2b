//! Long-poll synchronisation with the scheduler's asynchronous lifecycle.

use std::future::Future;

use tokio::time::Instant;
use tracing::debug;

use crate::config::BridgeConfig;
use crate::error::Result;

/// Re-fetches a resource until a predicate over it holds.
///
/// `fetch` is expected to block server-side (long poll) before returning an
/// unchanged resource; the loop only guarantees consecutive fetches are at
/// least `poll_interval` apart so a server that returns early cannot turn it
/// into a busy loop. Errors from `fetch` are returned as-is: callers map
/// not-found to [`Error::ResourceGone`](crate::Error::ResourceGone) and
/// transport faults to [`Error::ConnectionFailure`](crate::Error::ConnectionFailure).
/// No retry happens here.
#[derive(Debug, Clone)]
pub struct ResourceSync {
	config: BridgeConfig,
}

impl ResourceSync {
	pub fn new(config: &BridgeConfig) -> Self {
		Self { config: config.clone() }
	}

	pub async fn wait_until<R, F, Fut, P>(&self, mut fetch: F, mut predicate: P) -> Result<R>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<R>>,
		P: FnMut(&R) -> bool,
	{
		let mut attempt = 0u32;
		loop {
			let started = Instant::now();
			attempt += 1;
			let resource = fetch().await?;
			if predicate(&resource) {
				debug!(target = "fsched.sync", attempt, "resource ready");
				return Ok(resource);
			}

			debug!(target = "fsched.sync", attempt, "resource not ready, polling again");
			tokio::time::sleep_until(started + self.config.poll_interval).await;
		}
	}
}
