// Listener creation split from the async runtime
//
// The server binds before it detaches from the terminal, so bind errors are
// still reported to the invoking shell. At that point no runtime exists yet,
// which is why the listener is built with socket2 as a plain std listener and
// only handed to Tokio once the runtime is running.

use crate::{EchoError, Result};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;

/// Options applied to the listening socket before bind
#[derive(Debug, Clone)]
pub struct ListenOptions {
    /// Set SO_REUSEADDR so a restarted server can bind while old
    /// connections linger in TIME_WAIT
    pub reuse_address: bool,
    /// Pending connection queue length passed to listen()
    pub backlog: i32,
}

impl Default for ListenOptions {
    fn default() -> Self {
        Self {
            reuse_address: true,
            backlog: 128,
        }
    }
}

/// Creates, binds and listens on a TCP socket
///
/// Every failure is reported as [`EchoError::Bind`] with the original
/// `io::Error` as its source, so callers can still match on
/// `ErrorKind::AddrInUse`.
pub fn bind_listener(addr: SocketAddr, options: &ListenOptions) -> Result<std::net::TcpListener> {
    let bind_err = |source: std::io::Error| EchoError::Bind { addr, source };

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(bind_err)?;
    socket
        .set_reuse_address(options.reuse_address)
        .map_err(bind_err)?;
    socket.bind(&addr.into()).map_err(bind_err)?;
    socket.listen(options.backlog).map_err(bind_err)?;

    Ok(socket.into())
}

/// Registers a std listener with the current Tokio runtime
///
/// Tokio requires non-blocking sockets, so this must be called from inside
/// the runtime, after any fork has already happened.
pub fn into_tokio(listener: std::net::TcpListener) -> Result<tokio::net::TcpListener> {
    listener.set_nonblocking(true).map_err(EchoError::Tcp)?;
    tokio::net::TcpListener::from_std(listener).map_err(EchoError::Tcp)
}
