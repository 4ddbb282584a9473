use super::server::handle_session;
use super::{Accept, ClientConfig, DuplexClient, LineEchoServer, ServerConfig, Termination};
use crate::protocol::EchoProtocol;
use crate::EchoError;
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};
use tokio::time::Instant;

fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

/// Hands out queued accept results, then never accepts again
struct ScriptedAcceptor {
    results: VecDeque<io::Result<DuplexStream>>,
}

impl Accept for ScriptedAcceptor {
    type Stream = DuplexStream;

    async fn accept(&mut self) -> io::Result<(DuplexStream, SocketAddr)> {
        match self.results.pop_front() {
            Some(result) => result.map(|stream| (stream, peer())),
            None => std::future::pending().await,
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(peer())
    }
}

#[test]
fn test_server_config_default() {
    let config = ServerConfig::default();
    assert_eq!(config.buffer_size, 512);
    assert!(config.reuse_address);
    assert_eq!(config.accept_backoff, Duration::from_millis(100));
    assert_eq!(config.bind_addr.ip().to_string(), "127.0.0.1");
}

#[test]
fn test_client_config_builder() {
    let config = ClientConfig::default()
        .with_buffer_size(64)
        .with_poll_interval(Duration::from_millis(5));
    assert_eq!(config.buffer_size, 64);
    assert_eq!(config.poll_interval, Duration::from_millis(5));
    assert_eq!(ClientConfig::default().poll_interval, Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_interrupted_accept_retries_immediately() {
    let server = LineEchoServer::new(ServerConfig::default());
    let start = Instant::now();

    server
        .on_accept_error(&io::Error::from(io::ErrorKind::Interrupted))
        .await;

    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_failed_accept_waits_for_backoff() {
    let backoff = Duration::from_millis(250);
    let server = LineEchoServer::new(ServerConfig::default().with_accept_backoff(backoff));
    let start = Instant::now();

    server
        .on_accept_error(&io::Error::other("too many open files"))
        .await;

    assert_eq!(start.elapsed(), backoff);
}

#[tokio::test(start_paused = true)]
async fn test_accept_loop_keeps_serving_after_errors() {
    let backoff = Duration::from_millis(100);
    let server = LineEchoServer::new(ServerConfig::default().with_accept_backoff(backoff));
    let shutdown = server.shutdown_signal();

    let (mut client, stream) = duplex(1024);
    let acceptor = ScriptedAcceptor {
        results: VecDeque::from([
            Err(io::Error::from(io::ErrorKind::Interrupted)),
            Err(io::Error::from(io::ErrorKind::ConnectionAborted)),
            Ok(stream),
        ]),
    };
    let start = Instant::now();

    let script = async move {
        let mut buf = [0u8; 6];
        client.write_all(b"a\n").await.unwrap();
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"a:OK\r\n");
        drop(client);
        shutdown.send(()).unwrap();
    };

    let (outcome, ()) = tokio::join!(server.serve_from(acceptor), script);
    outcome.unwrap();
    // Only the non-interrupted error paid the backoff.
    assert_eq!(start.elapsed(), backoff);
}

#[tokio::test]
async fn test_session_answers_each_line_in_order() {
    let (mut client, server) = duplex(1024);
    let protocol = EchoProtocol::default();

    let script = async move {
        let mut buf = [0u8; 6];
        client.write_all(b"a\n").await.unwrap();
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"a:OK\r\n");

        client.write_all(b"b\r\n").await.unwrap();
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"b:OK\r\n");
    };

    let (outcome, ()) = tokio::join!(handle_session(server, peer(), &protocol), script);
    assert_eq!(outcome.unwrap(), 2);
}

#[tokio::test]
async fn test_session_ends_cleanly_on_immediate_close() {
    let (client, server) = duplex(64);
    drop(client);
    let outcome = handle_session(server, peer(), &EchoProtocol::default()).await;
    assert_eq!(outcome.unwrap(), 0);
}

#[tokio::test]
async fn test_session_truncates_chunk_at_first_terminator() {
    let stream = tokio_test::io::Builder::new()
        .read(b"first\nsecond\n")
        .write(b"first:OK\r\n")
        .build();
    let outcome = handle_session(stream, peer(), &EchoProtocol::default()).await;
    assert_eq!(outcome.unwrap(), 1);
}

#[tokio::test]
async fn test_session_receive_error_is_reported() {
    let stream = tokio_test::io::Builder::new()
        .read(b"x\n")
        .write(b"x:OK\r\n")
        .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        .build();
    let outcome = handle_session(stream, peer(), &EchoProtocol::default()).await;
    assert!(matches!(outcome, Err(EchoError::Tcp(e)) if e.kind() == io::ErrorKind::ConnectionReset));
}

#[tokio::test]
async fn test_session_send_error_is_reported() {
    let stream = tokio_test::io::Builder::new()
        .read(b"x\n")
        .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        .build();
    let outcome = handle_session(stream, peer(), &EchoProtocol::default()).await;
    assert!(matches!(outcome, Err(EchoError::Tcp(e)) if e.kind() == io::ErrorKind::BrokenPipe));
}

#[tokio::test]
async fn test_client_sends_raw_line_and_stops_at_input_eof() {
    let (socket, mut remote) = duplex(1024);
    let mut client = DuplexClient::new(socket, &b"ping\n"[..], Vec::new(), ClientConfig::default());

    assert_eq!(client.run().await.unwrap(), Termination::InputClosed);

    let (socket, _, display) = client.into_parts();
    drop(socket);
    let mut sent = Vec::new();
    remote.read_to_end(&mut sent).await.unwrap();
    assert_eq!(sent, b"ping\n");
    assert!(display.is_empty());
}

#[tokio::test]
async fn test_client_drops_unterminated_input_at_eof() {
    let (socket, mut remote) = duplex(1024);
    let mut client = DuplexClient::new(socket, &b"one\ntwo"[..], Vec::new(), ClientConfig::default());

    assert_eq!(client.run().await.unwrap(), Termination::InputClosed);

    drop(client);
    let mut sent = Vec::new();
    remote.read_to_end(&mut sent).await.unwrap();
    assert_eq!(sent, b"one\n");
}

#[tokio::test]
async fn test_client_displays_reply_verbatim() {
    let (socket, mut remote) = duplex(1024);
    let (input, mut keyboard) = duplex(1024);
    let mut client = DuplexClient::new(socket, input, Vec::new(), ClientConfig::default());

    let script = async move {
        keyboard.write_all(b"ping\n").await.unwrap();
        let mut line = [0u8; 5];
        remote.read_exact(&mut line).await.unwrap();
        assert_eq!(&line, b"ping\n");
        remote.write_all(b"ping:OK\r\n").await.unwrap();
        drop(remote);
        keyboard
    };

    let (termination, _keyboard) = tokio::join!(client.run(), script);
    assert_eq!(termination.unwrap(), Termination::PeerClosed);

    let (_, _, display) = client.into_parts();
    assert_eq!(display, b"ping:OK\r\n");
}

#[tokio::test]
async fn test_client_keeps_waiting_across_idle_ticks() {
    let (socket, mut remote) = duplex(1024);
    let (input, keyboard) = duplex(64);
    let config = ClientConfig::default().with_poll_interval(Duration::from_millis(5));
    let mut client = DuplexClient::new(socket, input, Vec::new(), config);

    let script = async move {
        tokio::time::sleep(Duration::from_millis(40)).await;
        remote.write_all(b"late\n").await.unwrap();
    };

    let (termination, ()) = tokio::join!(client.run(), script);
    assert_eq!(termination.unwrap(), Termination::PeerClosed);
    drop(keyboard);

    let (_, _, display) = client.into_parts();
    assert_eq!(display, b"late\n");
}

#[tokio::test]
async fn test_client_receive_error_is_fatal() {
    let socket = tokio_test::io::Builder::new()
        .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        .build();
    let mut client = DuplexClient::new(socket, tokio::io::empty(), Vec::new(), ClientConfig::default());

    let result = client.run().await;
    assert!(matches!(result, Err(EchoError::Tcp(e)) if e.kind() == io::ErrorKind::ConnectionReset));
}

#[tokio::test]
async fn test_client_send_error_is_fatal() {
    let socket = tokio_test::io::Builder::new()
        .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        .build();
    let mut client = DuplexClient::new(socket, &b"x\n"[..], Vec::new(), ClientConfig::default());

    let result = client.run().await;
    assert!(matches!(result, Err(EchoError::Tcp(e)) if e.kind() == io::ErrorKind::BrokenPipe));
}
