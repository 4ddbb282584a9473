use crate::{EchoError, Result};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;

/// Services database consulted for non-numeric service names
pub const SERVICES_PATH: &str = "/etc/services";

/// Resolves a host and a port or service name into one socket address
///
/// IPv4 results are preferred; if the host only has IPv6 addresses the first
/// of those is used.
///
/// # Examples
///
/// ```
/// use lineecho::network::resolve;
///
/// let addr = resolve("127.0.0.1", "7000").unwrap();
/// assert_eq!(addr.port(), 7000);
/// ```
pub fn resolve(host: &str, service: &str) -> Result<SocketAddr> {
    let resolve_err = |reason: String| EchoError::Resolve {
        host: host.to_string(),
        service: service.to_string(),
        reason,
    };

    let port = service_port(service, Path::new(SERVICES_PATH))
        .ok_or_else(|| resolve_err("unknown service".to_string()))?;

    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| resolve_err(e.to_string()))?
        .collect();

    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| resolve_err("no addresses found".to_string()))
}

/// Maps a numeric port or a TCP service name to a port number
///
/// Names are looked up in a services file with the usual
/// `name port/proto [aliases...]` layout; only `tcp` entries count.
pub fn service_port(service: &str, services: &Path) -> Option<u16> {
    if let Ok(port) = service.parse::<u16>() {
        return Some(port);
    }

    let contents = std::fs::read_to_string(services).ok()?;
    lookup_service(&contents, service)
}

fn lookup_service(contents: &str, service: &str) -> Option<u16> {
    contents.lines().find_map(|line| {
        let line = line.split('#').next().unwrap_or_default();
        let mut fields = line.split_whitespace();
        let name = fields.next()?;
        let (port, proto) = fields.next()?.split_once('/')?;
        if proto != "tcp" {
            return None;
        }
        let mut names = std::iter::once(name).chain(fields);
        if names.any(|n| n == service) {
            port.parse().ok()
        } else {
            None
        }
    })
}
