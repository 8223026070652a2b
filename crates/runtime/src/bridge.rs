//! Attach to an interactive job through the message-framed relay.
//!
//! The relay speaks newline-delimited [`RelayMessage`]s over one full-duplex
//! stream. After the start handshake one task turns local input into `input`
//! messages and another writes `output` payloads to the local sink; when the
//! relay side ends, the input task is cancelled.

use std::collections::BTreeMap;
use std::future::Future;

use fsched_protocol::RelayMessage;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::connection::{OutputSink, report};
use crate::error::{Error, Result};
use crate::session::LocalInput;

const INPUT_CHUNK: usize = 4096;

/// Parameters of a `RUN_INTERACTIVE_JOB` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachRequest {
	pub job_id: String,
	pub executable: String,
	pub arguments: Vec<String>,
	pub env: BTreeMap<String, String>,
}

impl AttachRequest {
	pub fn new(job_id: impl Into<String>, executable: impl Into<String>) -> Self {
		Self {
			job_id: job_id.into(),
			executable: executable.into(),
			arguments: Vec::new(),
			env: BTreeMap::new(),
		}
	}

	pub fn with_arguments(mut self, arguments: Vec<String>) -> Self {
		self.arguments = arguments;
		self
	}

	pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
		self.env = env;
		self
	}

	fn into_message(self) -> RelayMessage {
		RelayMessage::RunInteractiveJob {
			job_id: self.job_id,
			executable: self.executable,
			arguments: self.arguments,
			env: self.env,
		}
	}
}

/// One attach session over a relay stream.
pub struct InteractiveBridge<S> {
	stream: S,
	endpoint: String,
	config: BridgeConfig,
}

impl InteractiveBridge<TcpStream> {
	pub async fn connect(address: &str, config: &BridgeConfig) -> Result<Self> {
		debug!(target = "fsched.relay", address, "connecting to relay");
		let stream = TcpStream::connect(address).await.map_err(|source| Error::Connect {
			endpoint: address.to_string(),
			source,
		})?;
		if let Err(err) = stream.set_nodelay(true) {
			debug!(target = "fsched.relay", address, error = %err, "failed to set TCP_NODELAY");
		}
		Ok(Self::new(stream, address, config))
	}
}

impl<S> InteractiveBridge<S>
where
	S: AsyncRead + AsyncWrite + Send + 'static,
{
	pub fn new(stream: S, endpoint: impl Into<String>, config: &BridgeConfig) -> Self {
		Self {
			stream,
			endpoint: endpoint.into(),
			config: config.clone(),
		}
	}

	/// Starts `request` on the relay and bridges local I/O until the relay
	/// ends the session or `interrupt` resolves.
	///
	/// Fails with [`Error::AttachRejected`] unless the first reply is
	/// `INTERACTIVE_JOB_STARTED`.
	pub async fn attach<F>(self, request: AttachRequest, input: LocalInput, output: OutputSink, interrupt: F) -> Result<()>
	where
		F: Future<Output = ()>,
	{
		let Self { stream, endpoint, config } = self;
		let (reader, mut writer) = tokio::io::split(stream);
		let mut lines = BufReader::new(reader).lines();
		tokio::pin!(interrupt);

		let job_id = request.job_id.clone();
		let handshake = async {
			send(&mut writer, &request.into_message()).await.map_err(|source| Error::Transport {
				endpoint: endpoint.clone(),
				source,
			})?;
			let reply = lines.next_line().await.map_err(|source| Error::Transport {
				endpoint: endpoint.clone(),
				source,
			})?;
			check_started(reply)
		};
		tokio::select! {
			biased;
			_ = &mut interrupt => return Err(Error::UserCancelled),
			started = handshake => started?,
		}
		info!(target = "fsched.relay", job_id = %job_id, "interactive job started");

		let cancel = CancellationToken::new();
		let sender = tokio::spawn(send_input(input, writer, cancel.child_token(), endpoint.clone(), config.stream_diagnostics));
		let mut receiver = tokio::spawn(receive_output(lines, output, cancel.clone(), endpoint, config.stream_diagnostics));

		let finished = tokio::select! {
			joined = &mut receiver => Some(joined),
			_ = &mut interrupt => None,
		};

		cancel.cancel();
		let outcome = match finished {
			Some(Ok(result)) => result,
			Some(Err(err)) => Err(Error::Protocol(format!("output task failed: {err}"))),
			None => {
				receiver.abort();
				let _ = receiver.await;
				Err(Error::UserCancelled)
			}
		};
		let _ = sender.await;
		outcome
	}
}

fn check_started(reply: Option<String>) -> Result<()> {
	let Some(line) = reply else {
		return Err(Error::AttachRejected("relay closed the connection before replying".into()));
	};
	match RelayMessage::from_line(&line) {
		Ok(RelayMessage::InteractiveJobStarted) => Ok(()),
		Ok(RelayMessage::InteractiveJobFailed { error }) => Err(Error::AttachRejected(error.unwrap_or_else(|| "interactive job failed to start".into()))),
		Ok(other) => Err(Error::AttachRejected(format!("unexpected {} reply", other.command()))),
		Err(err) => Err(Error::AttachRejected(format!("malformed reply: {err}"))),
	}
}

async fn send<W>(writer: &mut W, message: &RelayMessage) -> std::io::Result<()>
where
	W: AsyncWrite + Unpin,
{
	let line = message.to_line()?;
	writer.write_all(line.as_bytes()).await?;
	writer.flush().await
}

async fn send_input<S>(input: LocalInput, mut writer: WriteHalf<S>, cancel: CancellationToken, endpoint: String, diagnostics: bool)
where
	S: AsyncRead + AsyncWrite,
{
	let mut reader = input.into_reader();
	let forward = async {
		let mut buf = vec![0u8; INPUT_CHUNK];
		let mut decoder = Utf8Decoder::default();
		loop {
			let n = reader.read(&mut buf).await?;
			let input = if n == 0 { decoder.finish() } else { decoder.decode(&buf[..n]) };
			if !input.is_empty() {
				send(&mut writer, &RelayMessage::Input { input }).await?;
			}
			if n == 0 {
				return Ok::<_, std::io::Error>(());
			}
		}
	};
	let result = tokio::select! {
		_ = cancel.cancelled() => Ok(()),
		result = forward => result,
	};
	report(&endpoint, "relay input", result, diagnostics);
	report(&endpoint, "relay half-close", writer.shutdown().await, diagnostics);
}

async fn receive_output<S>(
	mut lines: Lines<BufReader<ReadHalf<S>>>,
	output: OutputSink,
	cancel: CancellationToken,
	endpoint: String,
	diagnostics: bool,
) -> Result<()>
where
	S: AsyncRead + AsyncWrite,
{
	loop {
		let line = tokio::select! {
			_ = cancel.cancelled() => return Ok(()),
			line = lines.next_line() => line,
		};
		let line = match line {
			Ok(Some(line)) => line,
			Ok(None) => {
				debug!(target = "fsched.relay", endpoint = %endpoint, "relay closed the session");
				return Ok(());
			}
			Err(err) => {
				report(&endpoint, "relay output", Err(err), diagnostics);
				return Ok(());
			}
		};
		if line.trim().is_empty() {
			continue;
		}

		match RelayMessage::from_line(&line) {
			Ok(RelayMessage::Output { output: payload }) => {
				if let Err(err) = output.write_all(payload.as_bytes()).await {
					report(&endpoint, "local output", Err(err), diagnostics);
					return Ok(());
				}
			}
			Ok(RelayMessage::InteractiveJobFailed { error }) => {
				let reason = error.unwrap_or_else(|| "no reason given".into());
				warn!(target = "fsched.relay", endpoint = %endpoint, error = %reason, "interactive job failed");
				return Err(Error::InteractiveJobFailed(reason));
			}
			Ok(other) => debug!(target = "fsched.relay", command = other.command(), "ignoring relay message"),
			Err(err) => return Err(Error::Protocol(format!("malformed relay message: {err}"))),
		}
	}
}

/// Turns arbitrary input chunks into UTF-8 text without splitting characters.
///
/// A multi-byte sequence cut off at the end of a chunk is held back until the
/// next chunk completes it. Invalid bytes become U+FFFD.
#[derive(Debug, Default)]
struct Utf8Decoder {
	pending: Vec<u8>,
}

impl Utf8Decoder {
	fn decode(&mut self, bytes: &[u8]) -> String {
		self.pending.extend_from_slice(bytes);
		let mut text = String::new();
		let mut rest = self.pending.as_slice();
		loop {
			match std::str::from_utf8(rest) {
				Ok(valid) => {
					text.push_str(valid);
					rest = &[];
					break;
				}
				Err(err) => {
					let (valid, after) = rest.split_at(err.valid_up_to());
					text.push_str(&String::from_utf8_lossy(valid));
					match err.error_len() {
						Some(len) => {
							text.push(char::REPLACEMENT_CHARACTER);
							rest = &after[len..];
						}
						None => {
							rest = after;
							break;
						}
					}
				}
			}
		}
		self.pending = rest.to_vec();
		text
	}

	/// Flushes a trailing incomplete sequence at end of input.
	fn finish(&mut self) -> String {
		let text = String::from_utf8_lossy(&self.pending).into_owned();
		self.pending.clear();
		text
	}
}
