use super::config::ClientConfig;
use crate::protocol::InputLineCodec;
use crate::{EchoError, Result};
use bytes::BytesMut;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::sleep;
use tokio_util::codec::Decoder;
use tracing::{debug, info, trace};

/// Why a [`DuplexClient`] loop ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The remote side shut the connection down
    PeerClosed,
    /// The local input reached end of file
    InputClosed,
}

/// One readiness event picked by the wait in [`DuplexClient::run`]
enum Ready {
    Remote(io::Result<usize>),
    Local(io::Result<usize>),
    Idle,
}

/// Opens the TCP connection the client loop runs over
pub async fn connect(addr: SocketAddr) -> Result<TcpStream> {
    TcpStream::connect(addr)
        .await
        .map_err(|source| EchoError::Connect { addr, source })
}

/// Relays between a socket and a local input stream
///
/// Each cycle waits, for at most `poll_interval`, until the socket or the
/// local input is readable. Socket data is copied verbatim to `display`;
/// local input is split into lines, each sent with its terminator intact.
/// The socket is checked first when both are ready.
///
/// # Examples
///
/// ```no_run
/// use lineecho::{ClientConfig, DuplexClient};
/// use lineecho::tcp::connect;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let socket = connect("127.0.0.1:7000".parse()?).await?;
///     let mut client = DuplexClient::new(
///         socket,
///         tokio::io::stdin(),
///         tokio::io::stdout(),
///         ClientConfig::default(),
///     );
///     let termination = client.run().await?;
///     eprintln!("{termination:?}");
///     Ok(())
/// }
/// ```
pub struct DuplexClient<S, I, O> {
    socket: S,
    input: I,
    display: O,
    config: ClientConfig,
    codec: InputLineCodec,
    pending: BytesMut,
}

impl<S, I, O> DuplexClient<S, I, O>
where
    S: AsyncRead + AsyncWrite + Unpin,
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    pub fn new(socket: S, input: I, display: O, config: ClientConfig) -> Self {
        Self {
            socket,
            input,
            display,
            codec: InputLineCodec::new(config.buffer_size),
            pending: BytesMut::with_capacity(config.buffer_size),
            config,
        }
    }

    /// Runs until the peer closes, local input ends, or an I/O error occurs
    pub async fn run(&mut self) -> Result<Termination> {
        let mut buffer = vec![0u8; self.config.buffer_size.max(1)];
        let mut done = None;

        while done.is_none() {
            self.pending.reserve(self.config.buffer_size);

            // The branch futures are rebuilt on every pass.
            let ready = tokio::select! {
                biased;
                received = self.socket.read(&mut buffer) => Ready::Remote(received),
                read = self.input.read_buf(&mut self.pending) => Ready::Local(read),
                _ = sleep(self.config.poll_interval) => Ready::Idle,
            };

            done = match ready {
                Ready::Remote(received) => self.on_remote(received, &buffer).await?,
                Ready::Local(read) => self.on_local(read).await?,
                Ready::Idle => {
                    trace!("No activity");
                    None
                }
            };
        }

        Ok(done.unwrap_or(Termination::PeerClosed))
    }

    async fn on_remote(&mut self, received: io::Result<usize>, buffer: &[u8]) -> Result<Option<Termination>> {
        let n = received.map_err(EchoError::Tcp)?;
        if n == 0 {
            info!("Server closed connection");
            return Ok(Some(Termination::PeerClosed));
        }

        self.display.write_all(&buffer[..n]).await?;
        self.display.flush().await?;
        Ok(None)
    }

    async fn on_local(&mut self, read: io::Result<usize>) -> Result<Option<Termination>> {
        let n = read.map_err(EchoError::Tcp)?;

        if n == 0 {
            // An unterminated last line is discarded, never sent.
            if !self.pending.is_empty() {
                debug!(size = self.pending.len(), "Dropping unterminated input");
                self.pending.clear();
            }
            info!("Local input closed");
            return Ok(Some(Termination::InputClosed));
        }

        while let Some(line) = self.codec.decode(&mut self.pending)? {
            self.send_line(&line).await?;
        }
        Ok(None)
    }

    async fn send_line(&mut self, line: &[u8]) -> Result<()> {
        self.socket.write_all(line).await.map_err(EchoError::Tcp)?;
        self.socket.flush().await.map_err(EchoError::Tcp)?;
        debug!(size = line.len(), "Sent line");
        Ok(())
    }

    /// Hands back the socket, input and display
    pub fn into_parts(self) -> (S, I, O) {
        (self.socket, self.input, self.display)
    }
}
