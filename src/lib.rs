use std::net::SocketAddr;
use thiserror::Error;

/// Error types for the lineecho library
#[derive(Error, Debug)]
pub enum EchoError {
    /// TCP-related errors (accept, connect, read, write)
    #[error("TCP error: {0}")]
    Tcp(#[from] std::io::Error),

    /// Host or service could not be turned into a socket address
    #[error("Failed to resolve {host}:{service}: {reason}")]
    Resolve {
        host: String,
        service: String,
        reason: String,
    },

    /// Outgoing connection could not be established
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Socket creation, bind or listen failed
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The first fork of the daemonization sequence failed
    #[error("Daemonization failed: {0}")]
    Daemon(std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for the lineecho library
pub type Result<T> = std::result::Result<T, EchoError>;

pub mod daemon;
pub mod network;
pub mod protocol;
pub mod tcp;

// Re-export main types for convenience
pub use daemon::{DetachOptions, PidFile, detach_from_terminal};
pub use network::{ListenOptions, bind_listener, resolve};
pub use protocol::{EchoProtocol, InputLineCodec, MAX_LINE};
pub use tcp::{ClientConfig, DuplexClient, LineEchoServer, ServerConfig, Termination};
