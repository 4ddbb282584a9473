//! Line framing and the `:OK` echo protocol
//!
//! Nothing in here performs I/O. The server feeds received chunks through
//! [`EchoProtocol`], the client splits its local input with [`InputLineCodec`].

pub mod bounded;
pub mod codec;
pub mod line;

pub use bounded::{Appended, bounded_append};
pub use codec::InputLineCodec;
pub use line::{EchoProtocol, RESPONSE_SUFFIX, strip_terminator};

/// Size of the receive buffer and the upper bound on a response, in bytes
pub const MAX_LINE: usize = 512;
