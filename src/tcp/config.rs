use crate::network::ListenOptions;
use crate::protocol::MAX_LINE;
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the line echo server
///
/// # Examples
///
/// ```
/// use lineecho::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::new("127.0.0.1:7000".parse().unwrap())
///     .with_reuse_address(false)
///     .with_accept_backoff(Duration::from_millis(10));
/// assert_eq!(config.buffer_size, 512);
/// assert!(!config.reuse_address);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Receive buffer size, also the bound on a response
    pub buffer_size: usize,
    /// Set SO_REUSEADDR before binding
    pub reuse_address: bool,
    /// listen() backlog
    pub backlog: i32,
    /// Pause after a failed accept() that was not interrupted
    pub accept_backoff: Duration,
}

impl ServerConfig {
    /// Create a new configuration with the given address
    pub fn new(bind_addr: SocketAddr) -> Self {
        let listen = ListenOptions::default();
        Self {
            bind_addr,
            buffer_size: MAX_LINE,
            reuse_address: listen.reuse_address,
            backlog: listen.backlog,
            accept_backoff: Duration::from_millis(100),
        }
    }

    /// Set the buffer size
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Enable or disable SO_REUSEADDR
    pub fn with_reuse_address(mut self, reuse_address: bool) -> Self {
        self.reuse_address = reuse_address;
        self
    }

    /// Set the listen backlog
    pub fn with_backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Set the pause after a failed accept
    pub fn with_accept_backoff(mut self, backoff: Duration) -> Self {
        self.accept_backoff = backoff;
        self
    }

    /// Socket options derived from this configuration
    pub fn listen_options(&self) -> ListenOptions {
        ListenOptions {
            reuse_address: self.reuse_address,
            backlog: self.backlog,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 0)))
    }
}

/// Configuration for the duplex client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Size of the socket read buffer and the local line bound
    pub buffer_size: usize,
    /// Longest the readiness wait blocks before re-checking
    pub poll_interval: Duration,
}

impl ClientConfig {
    /// Set the buffer size
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Set the readiness wait bound
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            buffer_size: MAX_LINE,
            poll_interval: Duration::from_secs(1),
        }
    }
}
