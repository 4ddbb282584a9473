use super::MAX_LINE;
use super::bounded::bounded_append;

/// Suffix appended to every echoed line
pub const RESPONSE_SUFFIX: &[u8] = b":OK\r\n";

/// Cuts a received chunk at its first `\r` or `\n`.
///
/// Anything after the first terminator byte is discarded, including any
/// further lines that happened to arrive in the same chunk.
///
/// ```
/// use lineecho::protocol::strip_terminator;
///
/// assert_eq!(strip_terminator(b"hello\r\n"), b"hello");
/// assert_eq!(strip_terminator(b"hello\n"), b"hello");
/// assert_eq!(strip_terminator(b"hello"), b"hello");
/// ```
pub fn strip_terminator(chunk: &[u8]) -> &[u8] {
    match chunk.iter().position(|&b| b == b'\r' || b == b'\n') {
        Some(end) => &chunk[..end],
        None => chunk,
    }
}

/// The stateless request/response rule of the echo service
///
/// Each received line is answered with `<line>:OK\r\n`. Responses never
/// exceed `capacity - 1` bytes; when a line is too long for the whole suffix
/// to fit, only the part of the suffix that fits is sent.
///
/// # Examples
///
/// ```
/// use lineecho::EchoProtocol;
///
/// let protocol = EchoProtocol::default();
/// let line = protocol.frame(b"ping\r\n");
/// assert_eq!(protocol.respond(line), b"ping:OK\r\n");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoProtocol {
    capacity: usize,
}

impl EchoProtocol {
    /// Creates a protocol whose response buffer holds `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Response buffer size, including the reserved terminator byte
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Extracts the line from a received chunk
    pub fn frame<'a>(&self, chunk: &'a [u8]) -> &'a [u8] {
        strip_terminator(chunk)
    }

    /// Builds the response for one line (terminator already stripped)
    pub fn respond(&self, line: &[u8]) -> Vec<u8> {
        if self.capacity == 0 {
            return Vec::new();
        }

        let mut buf = vec![0u8; self.capacity];
        let copied = line.len().min(self.capacity - 1);
        buf[..copied].copy_from_slice(&line[..copied]);

        let appended = bounded_append(&mut buf, copied, RESPONSE_SUFFIX);
        buf.truncate(copied + appended.written);
        buf
    }

    /// Frames a received chunk and builds its response in one step
    pub fn handle(&self, chunk: &[u8]) -> Vec<u8> {
        self.respond(self.frame(chunk))
    }
}

impl Default for EchoProtocol {
    fn default() -> Self {
        Self::new(MAX_LINE)
    }
}
