use super::config::ServerConfig;
use crate::network::{bind_listener, into_tokio};
use crate::protocol::EchoProtocol;
use crate::{EchoError, Result};
use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{Instrument, debug, error, info};

/// Source of connections for the accept loop
#[allow(async_fn_in_trait)]
pub trait Accept {
    type Stream: AsyncRead + AsyncWrite + Unpin;

    async fn accept(&mut self) -> io::Result<(Self::Stream, SocketAddr)>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl Accept for TcpListener {
    type Stream = TcpStream;

    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

/// Sequential line echo server
///
/// Connections are served strictly one at a time: the accept loop does not
/// call `accept()` again until the current session has ended, so a second
/// client waits in the kernel backlog. Every received chunk is cut at its
/// first line terminator and answered with `<line>:OK\r\n`.
///
/// # Examples
///
/// ```no_run
/// use lineecho::{LineEchoServer, ServerConfig};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ServerConfig::new("127.0.0.1:7000".parse()?);
///     let server = LineEchoServer::new(config);
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub struct LineEchoServer {
    config: ServerConfig,
    protocol: EchoProtocol,
    shutdown_signal: Arc<tokio::sync::broadcast::Sender<()>>,
}

impl LineEchoServer {
    /// Creates a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_signal, _) = tokio::sync::broadcast::channel(1);
        Self {
            protocol: EchoProtocol::new(config.buffer_size),
            config,
            shutdown_signal: Arc::new(shutdown_signal),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds the configured address without needing a runtime
    pub fn bind(&self) -> Result<std::net::TcpListener> {
        bind_listener(self.config.bind_addr, &self.config.listen_options())
    }

    /// Binds the configured address and runs the accept loop
    pub async fn run(&self) -> Result<()> {
        let listener = into_tokio(self.bind()?)?;
        self.serve(listener).await
    }

    /// Runs the accept loop on an already bound listener
    ///
    /// Only a shutdown signal ends the loop. Accept errors are logged and
    /// retried; an interrupted accept is retried without logging.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        self.serve_from(listener).await
    }

    /// Runs the accept loop over any connection source
    pub async fn serve_from<A: Accept>(&self, mut acceptor: A) -> Result<()> {
        let local_addr = acceptor.local_addr()?;
        info!(address = %local_addr, "Line echo server listening");

        let mut shutdown_rx = self.shutdown_signal.subscribe();

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Received internal shutdown signal, stopping server");
                    break;
                }
                accept_result = acceptor.accept() => {
                    match accept_result {
                        Ok((stream, peer)) => self.run_session(stream, peer).await,
                        Err(e) => self.on_accept_error(&e).await,
                    }
                }
            }
        }

        info!("Line echo server stopped");
        Ok(())
    }

    /// Interrupted accepts return at once; anything else waits `accept_backoff`
    pub(crate) async fn on_accept_error(&self, e: &io::Error) {
        if e.kind() == ErrorKind::Interrupted {
            return;
        }
        error!(error = %e, "Failed to accept connection");
        tokio::time::sleep(self.config.accept_backoff).await;
    }

    /// Returns a sender that stops the accept loop once the current session ends
    pub fn shutdown_signal(&self) -> tokio::sync::broadcast::Sender<()> {
        self.shutdown_signal.as_ref().clone()
    }

    async fn run_session<S>(&self, stream: S, peer: SocketAddr)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        info!(%peer, "Accepted connection");

        let span = tracing::info_span!("session", %peer);
        match handle_session(stream, peer, &self.protocol).instrument(span).await {
            Ok(lines) => info!(%peer, lines, "Client closed connection"),
            Err(e) => error!(%peer, error = %e, "Error handling connection"),
        }

        info!(%peer, "Connection closed");
    }
}

/// Drives one session until the peer closes or an I/O error occurs
///
/// Returns the number of lines answered. The stream is dropped, and with it
/// closed, on every exit path.
pub async fn handle_session<S>(mut stream: S, peer: SocketAddr, protocol: &EchoProtocol) -> Result<usize>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = vec![0; protocol.capacity()];
    let mut lines = 0;

    loop {
        let n = stream.read(&mut buffer).await.map_err(EchoError::Tcp)?;
        if n == 0 {
            return Ok(lines);
        }

        let line = protocol.frame(&buffer[..n]);
        info!(%peer, size = n, line = %String::from_utf8_lossy(line), "Received line");

        let response = protocol.respond(line);
        stream.write_all(&response).await.map_err(EchoError::Tcp)?;
        stream.flush().await.map_err(EchoError::Tcp)?;
        lines += 1;

        debug!(%peer, size = response.len(), "Sent response");
    }
}
