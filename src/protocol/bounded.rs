/// Outcome of a [`bounded_append`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appended {
    /// Bytes of the source actually copied into the buffer
    pub written: usize,
    /// Length the content would have had without truncation
    pub total: usize,
}

impl Appended {
    /// Returns true if part of the source was dropped
    pub fn truncated(&self, src_len: usize) -> bool {
        self.written < src_len
    }
}

/// Appends `src` to the `len` bytes of content already held in `dst`.
///
/// `dst.len()` is the buffer capacity. One byte is always reserved for a
/// trailing zero, so at most `capacity - 1 - len` bytes of `src` are copied.
/// The returned `total` is `len + src.len()` whether or not anything was cut,
/// which lets callers detect truncation by comparing it to the capacity.
///
/// A `len` larger than the capacity is clamped to it.
///
/// # Examples
///
/// ```
/// use lineecho::protocol::bounded_append;
///
/// let mut buf = [0u8; 8];
/// buf[..3].copy_from_slice(b"abc");
/// let appended = bounded_append(&mut buf, 3, b"defgh");
/// assert_eq!(appended.written, 4);
/// assert_eq!(appended.total, 8);
/// assert_eq!(&buf, b"abcdefg\0");
/// ```
pub fn bounded_append(dst: &mut [u8], len: usize, src: &[u8]) -> Appended {
    let capacity = dst.len();
    let len = len.min(capacity);
    let total = len + src.len();

    if len == capacity {
        return Appended { written: 0, total };
    }

    let room = capacity - 1 - len;
    let written = src.len().min(room);
    dst[len..len + written].copy_from_slice(&src[..written]);
    dst[len + written] = 0;

    Appended { written, total }
}
