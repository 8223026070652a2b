//! Session orchestration across every execution of a job step.

use std::future::Future;
use std::io::IsTerminal;

use fsched_protocol::JobStep;
use futures_util::future::join_all;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::connection::{ConnectionState, InputHandle, OutputSink, StepConnection};
use crate::error::{Error, Result, is_expected_stream_end};
use crate::terminal::RawModeGuard;

const RAW_CHUNK: usize = 1024;

/// How local input reaches the remote processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
	/// Each line is broadcast to every execution.
	Line,
	/// Raw bytes go to the single execution's pseudo-terminal.
	Pty,
}

impl InputMode {
	pub fn from_pty(pty: bool) -> Self {
		if pty { Self::Pty } else { Self::Line }
	}
}

/// Local input source for a session.
pub struct LocalInput {
	reader: Box<dyn AsyncRead + Send + Unpin>,
	terminal: bool,
}

impl LocalInput {
	/// The process's standard input; raw mode applies only when it is a terminal.
	pub fn stdin() -> Self {
		Self {
			reader: Box::new(tokio::io::stdin()),
			terminal: std::io::stdin().is_terminal(),
		}
	}

	pub fn from_reader<R>(reader: R) -> Self
	where
		R: AsyncRead + Send + Unpin + 'static,
	{
		Self {
			reader: Box::new(reader),
			terminal: false,
		}
	}

	pub fn is_terminal(&self) -> bool {
		self.terminal
	}

	pub(crate) fn into_reader(self) -> Box<dyn AsyncRead + Send + Unpin> {
		self.reader
	}
}

impl std::fmt::Debug for LocalInput {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LocalInput").field("terminal", &self.terminal).finish_non_exhaustive()
	}
}

/// Builds sessions from job steps.
#[derive(Debug, Clone)]
pub struct SessionOrchestrator {
	config: BridgeConfig,
}

impl SessionOrchestrator {
	pub fn new(config: &BridgeConfig) -> Self {
		Self { config: config.clone() }
	}

	/// Validates the topology and creates one unconnected connection per execution.
	///
	/// Nothing touches the network here, so a rejected topology opens no sockets.
	pub fn prepare(&self, step: &JobStep, mode: InputMode) -> Result<SessionHandle> {
		let executions = step.executions.len();
		if executions == 0 {
			return Err(Error::NoExecutions);
		}
		if mode == InputMode::Pty && executions != 1 {
			return Err(Error::UnsupportedTopology(executions));
		}

		let connections = step
			.executions
			.iter()
			.cloned()
			.map(|execution| StepConnection::new(execution, &self.config))
			.collect();
		Ok(SessionHandle {
			mode,
			connections,
			distributor: None,
		})
	}

	/// Bridges `input`/`output` to every execution of `step` until all remote
	/// sides finish or `interrupt` resolves.
	///
	/// Every connection is closed before this returns; an interrupt yields
	/// [`Error::UserCancelled`].
	pub async fn run<F>(&self, step: &JobStep, mode: InputMode, input: LocalInput, output: OutputSink, interrupt: F) -> Result<()>
	where
		F: Future<Output = ()>,
	{
		let mut session = self.prepare(step, mode)?;
		session.run(input, output, interrupt).await
	}
}

/// The live connections of one session plus its input distribution task.
pub struct SessionHandle {
	mode: InputMode,
	connections: Vec<StepConnection>,
	distributor: Option<JoinHandle<()>>,
}

impl SessionHandle {
	pub fn mode(&self) -> InputMode {
		self.mode
	}

	pub fn connections(&self) -> &[StepConnection] {
		&self.connections
	}

	/// Connects, distributes input and waits for the remote sides, then tears down.
	pub async fn run<F>(&mut self, input: LocalInput, output: OutputSink, interrupt: F) -> Result<()>
	where
		F: Future<Output = ()>,
	{
		let result = self.drive(input, output, interrupt).await;
		self.shutdown().await;
		result
	}

	async fn drive<F>(&mut self, input: LocalInput, output: OutputSink, interrupt: F) -> Result<()>
	where
		F: Future<Output = ()>,
	{
		tokio::pin!(interrupt);

		let connected = tokio::select! {
			biased;
			_ = &mut interrupt => return Err(Error::UserCancelled),
			connected = self.connect_all(&output) => connected,
		};
		if connected == 0 {
			return Err(Error::NoReachableExecution(self.connections.len()));
		}
		info!(target = "fsched.session", connected, total = self.connections.len(), mode = ?self.mode, "session established");

		let raw_mode = RawModeGuard::new(self.mode == InputMode::Pty && input.is_terminal());
		if self.mode == InputMode::Pty && !raw_mode.is_active() {
			debug!(target = "fsched.session", "local input is not in raw mode, forwarding it as is");
		}
		let targets: Vec<InputHandle> = self
			.connections
			.iter()
			.filter(|connection| connection.state() == ConnectionState::Connected)
			.map(StepConnection::input_handle)
			.collect();
		self.distributor = Some(tokio::spawn(distribute(self.mode, input, targets)));

		let outcome = tokio::select! {
			_ = join_all(self.connections.iter_mut().map(StepConnection::join)) => Ok(()),
			_ = &mut interrupt => Err(Error::UserCancelled),
		};
		drop(raw_mode);
		outcome
	}

	async fn connect_all(&mut self, output: &OutputSink) -> usize {
		let results = join_all(self.connections.iter_mut().map(|connection| connection.connect(output.clone()))).await;

		let mut connected = 0;
		for result in results {
			match result {
				Ok(()) => connected += 1,
				Err(err) => warn!(target = "fsched.session", error = %err, "execution unreachable"),
			}
		}
		connected
	}

	/// Cancels input distribution, closes every connection and waits for
	/// their sockets to be released. Idempotent.
	pub async fn shutdown(&mut self) {
		if let Some(distributor) = self.distributor.take() {
			distributor.abort();
			let _ = distributor.await;
		}
		for connection in &mut self.connections {
			connection.close();
		}
		for connection in &mut self.connections {
			connection.join().await;
		}
		debug!(target = "fsched.session", "session torn down");
	}
}

impl Drop for SessionHandle {
	fn drop(&mut self) {
		if let Some(distributor) = self.distributor.take() {
			distributor.abort();
		}
		for connection in &mut self.connections {
			connection.close();
		}
	}
}

impl std::fmt::Debug for SessionHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionHandle")
			.field("mode", &self.mode)
			.field("connections", &self.connections)
			.finish_non_exhaustive()
	}
}

async fn distribute(mode: InputMode, input: LocalInput, targets: Vec<InputHandle>) {
	let reader = input.into_reader();
	let result = match mode {
		InputMode::Pty => match targets.first() {
			Some(target) => copy_raw(reader, target).await,
			None => Ok(()),
		},
		InputMode::Line => broadcast_lines(reader, &targets).await,
	};

	match result {
		Ok(()) => debug!(target = "fsched.session", "local input finished"),
		Err(err) if is_expected_stream_end(&err) => debug!(target = "fsched.session", error = %err, "local input closed"),
		Err(err) => warn!(target = "fsched.session", error = %err, "failed reading local input"),
	}

	for target in &targets {
		target.close();
	}
}

async fn copy_raw<R>(mut reader: R, target: &InputHandle) -> std::io::Result<()>
where
	R: AsyncRead + Unpin,
{
	let mut buf = vec![0u8; RAW_CHUNK];
	loop {
		let n = reader.read(&mut buf).await?;
		if n == 0 {
			return Ok(());
		}
		if target.write(&buf[..n]).await.is_err() {
			debug!(target = "fsched.session", endpoint = target.endpoint(), "remote input closed");
			return Ok(());
		}
	}
}

/// Offers each line to every target before reading the next one.
async fn broadcast_lines<R>(reader: R, targets: &[InputHandle]) -> std::io::Result<()>
where
	R: AsyncRead + Unpin,
{
	let mut reader = BufReader::new(reader);
	let mut line = Vec::new();
	loop {
		line.clear();
		if reader.read_until(b'\n', &mut line).await? == 0 {
			return Ok(());
		}

		let mut delivered = 0;
		for target in targets {
			match target.write(line.clone()).await {
				Ok(()) => delivered += 1,
				Err(_) => debug!(target = "fsched.session", endpoint = target.endpoint(), "skipping closed input"),
			}
		}
		if delivered == 0 {
			return Ok(());
		}
	}
}
