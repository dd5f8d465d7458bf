//! Append-only input buffer shared between `consume` calls.

/// Accumulates raw input bytes and tracks how far the lexer has scanned.
///
/// `resume` marks the first byte that has not yet contributed to an emitted
/// token, so already-tokenized bytes are never re-scanned. The buffer is kept
/// whole while the document is open; once the root closes it may be
/// compacted, with `base` keeping absolute offsets stable for error messages.
#[derive(Debug, Default)]
pub(crate) struct InputBuffer {
    bytes: Vec<u8>,
    resume: usize,
    base: usize,
}

impl InputBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// Total retained bytes.
    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn resume(&self) -> usize {
        self.resume
    }

    /// Next unscanned byte, if any.
    pub(crate) fn peek(&self) -> Option<u8> {
        self.bytes.get(self.resume).copied()
    }

    /// Move the resume position forward to `pos`.
    pub(crate) fn advance_to(&mut self, pos: usize) {
        debug_assert!(pos >= self.resume && pos <= self.bytes.len());
        self.resume = pos;
    }

    /// Absolute offset of a buffer index, across compactions.
    pub(crate) fn offset(&self, index: usize) -> usize {
        self.base + index
    }

    /// Drop the scanned prefix. Only sound once no continuation state can
    /// refer back into it, i.e. after the document root has closed.
    pub(crate) fn compact(&mut self) {
        if self.resume > 0 {
            self.bytes.drain(..self.resume);
            self.base += self.resume;
            self.resume = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_scan() {
        let mut buf = InputBuffer::new();
        buf.append(b"ab");
        buf.append(b"cd");
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.peek(), Some(b'a'));

        buf.advance_to(3);
        assert_eq!(buf.peek(), Some(b'd'));
        assert_eq!(buf.resume(), 3);
    }

    #[test]
    fn test_compact_preserves_absolute_offsets() {
        let mut buf = InputBuffer::new();
        buf.append(b"abcdef");
        buf.advance_to(4);
        buf.compact();

        assert_eq!(buf.len(), 2);
        assert_eq!(buf.resume(), 0);
        assert_eq!(buf.peek(), Some(b'e'));
        assert_eq!(buf.offset(0), 4);
    }
}
