//! StepConnection behaviour against loopback stepd doubles.

use std::time::Duration;

use fsched_protocol::{Execution, ExecutionState};
use fsched_runtime::{BridgeConfig, ConnectionState, Error, OutputSink, StepConnection};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

const WITHIN: Duration = Duration::from_secs(5);

async fn stepd() -> (TcpListener, Execution) {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let port = listener.local_addr().unwrap().port();
	let execution = Execution {
		id: format!("1.0.{port}"),
		node: "127.0.0.1".into(),
		port,
		state: ExecutionState::Running,
	};
	(listener, execution)
}

async fn accept(listener: &TcpListener) -> TcpStream {
	timeout(WITHIN, listener.accept()).await.unwrap().unwrap().0
}

#[tokio::test]
async fn input_round_trips_byte_for_byte_in_order() {
	let (listener, execution) = stepd().await;
	let mut connection = StepConnection::new(execution, &BridgeConfig::default());
	connection.connect(OutputSink::new(tokio::io::sink())).await.unwrap();
	let mut remote = accept(&listener).await;

	let chunks: Vec<Vec<u8>> = vec![b"first\n".to_vec(), vec![0, 159, 146, 150, 255], b"\x1b[A\r\n".to_vec(), vec![b'x'; 20_000]];
	for chunk in &chunks {
		connection.write(chunk.clone()).await.unwrap();
	}
	connection.close_input();
	assert_eq!(connection.state(), ConnectionState::Closing);

	// Reading to EOF proves the write side was half-closed after the last byte.
	let mut received = Vec::new();
	timeout(WITHIN, remote.read_to_end(&mut received)).await.unwrap().unwrap();
	assert_eq!(received, chunks.concat());

	drop(remote);
	timeout(WITHIN, connection.join()).await.unwrap();
	assert_eq!(connection.state(), ConnectionState::Joined);
	assert!(connection.is_finished());
}

#[tokio::test]
async fn remote_output_reaches_local_sink() {
	let (listener, execution) = stepd().await;
	let (local, mut terminal) = tokio::io::duplex(1024);
	let mut connection = StepConnection::new(execution, &BridgeConfig::default());
	connection.connect(OutputSink::new(local)).await.unwrap();
	let mut remote = accept(&listener).await;

	remote.write_all(b"node1\n").await.unwrap();
	remote.shutdown().await.unwrap();
	drop(remote);

	timeout(WITHIN, connection.join()).await.unwrap();
	connection.close();
	drop(connection);

	let mut shown = String::new();
	timeout(WITHIN, terminal.read_to_string(&mut shown)).await.unwrap().unwrap();
	assert_eq!(shown, "node1\n");
}

#[tokio::test]
async fn remote_close_cancels_upstream_without_touching_siblings() {
	let (first_listener, first_execution) = stepd().await;
	let (second_listener, second_execution) = stepd().await;
	let config = BridgeConfig::default();

	let mut first = StepConnection::new(first_execution, &config);
	let mut second = StepConnection::new(second_execution, &config);
	first.connect(OutputSink::new(tokio::io::sink())).await.unwrap();
	second.connect(OutputSink::new(tokio::io::sink())).await.unwrap();
	let first_remote = accept(&first_listener).await;
	let mut second_remote = accept(&second_listener).await;

	// The first remote exits with its input still open.
	drop(first_remote);
	timeout(WITHIN, first.join()).await.expect("upstream should be cancelled once the remote closes");
	assert!(matches!(first.write(b"too late\n".to_vec()).await, Err(Error::ClosedChannel)));

	// The sibling keeps accepting input.
	assert!(!second.is_finished());
	second.write(b"still here\n".to_vec()).await.unwrap();
	let mut buf = [0u8; 11];
	timeout(WITHIN, second_remote.read_exact(&mut buf)).await.unwrap().unwrap();
	assert_eq!(&buf, b"still here\n");

	second.close();
	timeout(WITHIN, second.join()).await.unwrap();
	assert!(second.is_closed());
}

#[tokio::test]
async fn close_releases_the_socket() {
	let (listener, execution) = stepd().await;
	let mut connection = StepConnection::new(execution, &BridgeConfig::default());
	connection.connect(OutputSink::new(tokio::io::sink())).await.unwrap();
	let mut remote = accept(&listener).await;

	connection.close();
	timeout(WITHIN, connection.join()).await.unwrap();

	let mut rest = Vec::new();
	// EOF or reset both count; what matters is that the read returns.
	let _ = timeout(WITHIN, remote.read_to_end(&mut rest)).await.expect("remote should observe the close");
	assert!(rest.is_empty());
	assert!(connection.is_closed());
}

#[tokio::test]
async fn connect_twice_is_rejected() {
	let (listener, execution) = stepd().await;
	let mut connection = StepConnection::new(execution, &BridgeConfig::default());
	connection.connect(OutputSink::new(tokio::io::sink())).await.unwrap();
	let _remote = accept(&listener).await;

	assert!(matches!(connection.connect(OutputSink::new(tokio::io::sink())).await, Err(Error::AlreadyConnected(_))));
	connection.close();
	connection.join().await;
}
