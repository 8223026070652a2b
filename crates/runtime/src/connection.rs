//! Raw byte bridge between local I/O and one execution's stepd socket.
//!
//! A connected [`StepConnection`] runs two tasks:
//!
//! * upstream: input queue → socket, then half-closes the socket's write side
//! * downstream: socket → [`OutputSink`], then cancels the upstream task
//!
//! The upstream task listens on a child of the connection's cancellation
//! token, so a remote close only ever stops this connection's writer.

use std::io;
use std::sync::Arc;

use fsched_protocol::Execution;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::error::{Error, Result, is_expected_stream_end};

const READ_CHUNK: usize = 8192;

/// Shared destination for remote output.
///
/// Every connection in a session writes through the same sink; each chunk is
/// written and flushed under the lock so chunks never interleave.
#[derive(Clone)]
pub struct OutputSink {
	inner: Arc<tokio::sync::Mutex<Box<dyn AsyncWrite + Send + Unpin>>>,
}

impl OutputSink {
	pub fn new<W>(writer: W) -> Self
	where
		W: AsyncWrite + Send + Unpin + 'static,
	{
		Self {
			inner: Arc::new(tokio::sync::Mutex::new(Box::new(writer))),
		}
	}

	pub fn stdout() -> Self {
		Self::new(tokio::io::stdout())
	}

	pub async fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
		let mut writer = self.inner.lock().await;
		writer.write_all(bytes).await?;
		writer.flush().await
	}
}

impl std::fmt::Debug for OutputSink {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("OutputSink").finish_non_exhaustive()
	}
}

/// Writer side of a connection's input queue.
///
/// Cheap to clone; [`close`](Self::close) on any clone closes the queue for
/// all of them once in-flight sends finish.
#[derive(Clone)]
pub struct InputHandle {
	endpoint: Arc<str>,
	tx: Arc<parking_lot::Mutex<Option<mpsc::Sender<Vec<u8>>>>>,
}

impl InputHandle {
	pub(crate) fn new(endpoint: Arc<str>, tx: mpsc::Sender<Vec<u8>>) -> Self {
		Self {
			endpoint,
			tx: Arc::new(parking_lot::Mutex::new(Some(tx))),
		}
	}

	/// Queues `bytes` for the remote side.
	///
	/// Fails with [`Error::ClosedChannel`] after [`close`](Self::close) or once
	/// the upstream task has stopped.
	pub async fn write(&self, bytes: impl Into<Vec<u8>>) -> Result<()> {
		let tx = self.tx.lock().clone().ok_or(Error::ClosedChannel)?;
		tx.send(bytes.into()).await.map_err(|_| Error::ClosedChannel)
	}

	pub fn close(&self) {
		self.tx.lock().take();
	}

	pub fn is_closed(&self) -> bool {
		self.tx.lock().as_ref().is_none_or(|tx| tx.is_closed())
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}
}

impl std::fmt::Debug for InputHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("InputHandle")
			.field("endpoint", &self.endpoint)
			.field("closed", &self.is_closed())
			.finish()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
	Created,
	Connected,
	/// Input side closed, copy tasks still running.
	Closing,
	/// Both copy tasks finished.
	Joined,
	Closed,
}

/// One TCP bridge to one execution's stepd endpoint.
pub struct StepConnection {
	execution: Execution,
	endpoint: Arc<str>,
	config: BridgeConfig,
	input: InputHandle,
	pending_input: Option<mpsc::Receiver<Vec<u8>>>,
	cancel: CancellationToken,
	upstream: Option<JoinHandle<()>>,
	downstream: Option<JoinHandle<()>>,
	state: ConnectionState,
}

impl StepConnection {
	pub fn new(execution: Execution, config: &BridgeConfig) -> Self {
		let endpoint: Arc<str> = Arc::from(execution.endpoint());
		let (tx, rx) = mpsc::channel(config.input_queue_depth.max(1));
		Self {
			input: InputHandle::new(Arc::clone(&endpoint), tx),
			execution,
			endpoint,
			config: config.clone(),
			pending_input: Some(rx),
			cancel: CancellationToken::new(),
			upstream: None,
			downstream: None,
			state: ConnectionState::Created,
		}
	}

	pub fn execution(&self) -> &Execution {
		&self.execution
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	pub fn state(&self) -> ConnectionState {
		self.state
	}

	pub fn is_closed(&self) -> bool {
		self.state == ConnectionState::Closed
	}

	/// `true` once both copy tasks have terminated (or were never started).
	pub fn is_finished(&self) -> bool {
		self.upstream.as_ref().is_none_or(JoinHandle::is_finished) && self.downstream.as_ref().is_none_or(JoinHandle::is_finished)
	}

	/// Opens the socket and starts both copy tasks.
	///
	/// A failed connect leaves the connection closed.
	pub async fn connect(&mut self, output: OutputSink) -> Result<()> {
		if self.state != ConnectionState::Created {
			return Err(Error::AlreadyConnected(self.endpoint.to_string()));
		}
		let Some(input) = self.pending_input.take() else {
			return Err(Error::AlreadyConnected(self.endpoint.to_string()));
		};

		debug!(target = "fsched.stream", endpoint = %self.endpoint, "connecting to stepd");
		let stream = match TcpStream::connect((self.execution.node.as_str(), self.execution.port)).await {
			Ok(stream) => stream,
			Err(source) => {
				self.input.close();
				self.state = ConnectionState::Closed;
				return Err(Error::Connect {
					endpoint: self.endpoint.to_string(),
					source,
				});
			}
		};
		if let Err(err) = stream.set_nodelay(true) {
			debug!(target = "fsched.stream", endpoint = %self.endpoint, error = %err, "failed to set TCP_NODELAY");
		}
		let (reader, writer) = stream.into_split();

		let upstream_cancel = self.cancel.child_token();
		self.upstream = Some(tokio::spawn(run_upstream(
			input,
			writer,
			upstream_cancel.clone(),
			Arc::clone(&self.endpoint),
			self.config.stream_diagnostics,
		)));
		self.downstream = Some(tokio::spawn(run_downstream(
			reader,
			output,
			self.cancel.clone(),
			upstream_cancel,
			Arc::clone(&self.endpoint),
			self.config.stream_diagnostics,
		)));
		self.state = ConnectionState::Connected;
		Ok(())
	}

	/// Handle for feeding the input queue from another task.
	pub fn input_handle(&self) -> InputHandle {
		self.input.clone()
	}

	pub async fn write(&self, bytes: impl Into<Vec<u8>>) -> Result<()> {
		self.input.write(bytes).await
	}

	/// Ends the input stream; the upstream task drains what is queued, then half-closes.
	pub fn close_input(&mut self) {
		self.input.close();
		if self.state == ConnectionState::Connected {
			self.state = ConnectionState::Closing;
		}
	}

	/// Waits for both copy tasks to terminate.
	///
	/// Safe to cancel: an interrupted join leaves the tasks attached and a
	/// later call resumes waiting on them.
	pub async fn join(&mut self) {
		for slot in [&mut self.upstream, &mut self.downstream] {
			if let Some(handle) = slot.as_mut() {
				if let Err(err) = handle.await {
					if err.is_panic() {
						warn!(target = "fsched.stream", endpoint = %self.endpoint, "copy task panicked");
					}
				}
				*slot = None;
			}
		}
		if matches!(self.state, ConnectionState::Connected | ConnectionState::Closing) {
			self.state = ConnectionState::Joined;
		}
	}

	/// Closes the input side and cancels both copy tasks. Idempotent.
	///
	/// The socket is released as soon as the tasks observe cancellation;
	/// follow with [`join`](Self::join) to wait for that.
	pub fn close(&mut self) {
		if self.state == ConnectionState::Closed {
			return;
		}
		self.input.close();
		self.cancel.cancel();
		self.state = ConnectionState::Closed;
		debug!(target = "fsched.stream", endpoint = %self.endpoint, "connection closed");
	}
}

impl Drop for StepConnection {
	fn drop(&mut self) {
		self.input.close();
		self.cancel.cancel();
	}
}

impl std::fmt::Debug for StepConnection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StepConnection")
			.field("endpoint", &self.endpoint)
			.field("state", &self.state)
			.finish_non_exhaustive()
	}
}

async fn run_upstream(
	mut input: mpsc::Receiver<Vec<u8>>,
	mut writer: OwnedWriteHalf,
	cancel: CancellationToken,
	endpoint: Arc<str>,
	diagnostics: bool,
) {
	let result = tokio::select! {
		_ = cancel.cancelled() => {
			debug!(target = "fsched.stream", endpoint = %endpoint, "upstream cancelled");
			Ok(())
		}
		result = forward_input(&mut input, &mut writer) => result,
	};
	input.close();
	report(&endpoint, "upstream", result, diagnostics);

	// The only shutdown of the write half; dropping it afterwards is a no-op.
	report(&endpoint, "half-close", writer.shutdown().await, diagnostics);
}

async fn forward_input(input: &mut mpsc::Receiver<Vec<u8>>, writer: &mut OwnedWriteHalf) -> io::Result<()> {
	while let Some(chunk) = input.recv().await {
		writer.write_all(&chunk).await?;
	}
	Ok(())
}

async fn run_downstream(
	mut reader: OwnedReadHalf,
	output: OutputSink,
	cancel: CancellationToken,
	upstream_cancel: CancellationToken,
	endpoint: Arc<str>,
	diagnostics: bool,
) {
	let result = tokio::select! {
		_ = cancel.cancelled() => Ok(()),
		result = forward_output(&mut reader, &output) => result,
	};
	report(&endpoint, "downstream", result, diagnostics);
	upstream_cancel.cancel();
}

pub(crate) async fn forward_output<R>(reader: &mut R, output: &OutputSink) -> io::Result<()>
where
	R: AsyncRead + Unpin,
{
	let mut buf = vec![0u8; READ_CHUNK];
	loop {
		let n = reader.read(&mut buf).await?;
		if n == 0 {
			return Ok(());
		}
		output.write_all(&buf[..n]).await?;
	}
}

pub(crate) fn report(endpoint: &str, direction: &'static str, result: io::Result<()>, diagnostics: bool) {
	match result {
		Ok(()) => debug!(target = "fsched.stream", endpoint, direction, "stream finished"),
		Err(err) if is_expected_stream_end(&err) => {
			if diagnostics {
				debug!(target = "fsched.stream", endpoint, direction, error = %err, "stream ended by peer");
			}
		}
		Err(err) => warn!(target = "fsched.stream", endpoint, direction, error = %err, "stream copy failed"),
	}
}
