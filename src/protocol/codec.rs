use super::MAX_LINE;
use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;

/// Splits local input into raw lines, terminators included
///
/// Lines are bounded the way a fixed-size `fgets` buffer bounds them: a line
/// longer than `capacity - 1` bytes comes out as several pieces, the last of
/// which carries the terminator.
#[derive(Debug, Clone)]
pub struct InputLineCodec {
    max_len: usize,
}

impl InputLineCodec {
    /// Creates a codec for a line buffer of `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            max_len: capacity.saturating_sub(1).max(1),
        }
    }

    /// Longest piece this codec will emit
    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

impl Default for InputLineCodec {
    fn default() -> Self {
        Self::new(MAX_LINE)
    }
}

impl Decoder for InputLineCodec {
    type Item = Bytes;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, Self::Error> {
        let window = src.len().min(self.max_len);
        if let Some(pos) = src[..window].iter().position(|&b| b == b'\n') {
            return Ok(Some(src.split_to(pos + 1).freeze()));
        }
        if src.len() >= self.max_len {
            return Ok(Some(src.split_to(self.max_len).freeze()));
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, Self::Error> {
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            None if src.is_empty() => Ok(None),
            None => Ok(Some(src.split().freeze())),
        }
    }
}
