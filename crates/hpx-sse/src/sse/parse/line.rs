//! Incremental line decoder for SSE byte streams.

use bytes::{Buf, BytesMut};

use super::constants::{BOM, CR, LF};

/// Splits a stream of byte chunks into complete text lines.
///
/// Lines may be terminated by LF, CR or CRLF; the terminator is not part of
/// the line. Bytes of an unterminated line (including a multi-byte character
/// cut by a chunk boundary) stay buffered until its terminator arrives, so the
/// output never depends on where the transport split the body. Invalid UTF-8
/// is replaced with U+FFFD.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: BytesMut,
    /// The previous chunk ended in CR: a leading LF belongs to that CRLF.
    skip_lf: bool,
    bom_checked: bool,
}

impl LineDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completed, in order.
    pub fn append(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut chunk = chunk;

        if chunk.is_empty() {
            return lines;
        }
        if self.skip_lf {
            self.skip_lf = false;
            if chunk[0] == LF {
                chunk = &chunk[1..];
            }
        }

        // Buffered bytes never contain a terminator, so only new bytes are scanned.
        let mut scan_from = self.buffer.len();
        self.buffer.extend_from_slice(chunk);

        if !self.bom_checked {
            match starts_with_bom(&self.buffer) {
                Some(true) => self.buffer.advance(BOM.len()),
                Some(false) => {}
                None => return lines,
            }
            self.bom_checked = true;
            scan_from = 0;
        }

        let mut start = 0;
        while let Some(offset) = memchr::memchr2(CR, LF, &self.buffer[scan_from..]) {
            let eol = scan_from + offset;
            lines.push(String::from_utf8_lossy(&self.buffer[start..eol]).into_owned());

            let mut next = eol + 1;
            if self.buffer[eol] == CR {
                match self.buffer.get(next) {
                    Some(&LF) => next += 1,
                    Some(_) => {}
                    None => self.skip_lf = true,
                }
            }
            start = next;
            scan_from = next;
        }
        self.buffer.advance(start);

        lines
    }

    /// Number of bytes held back waiting for a terminator.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop all buffered state, as if the decoder had just been created.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// `Some(true)` when `buf` starts with a BOM, `Some(false)` when it cannot,
/// `None` when more bytes are needed to decide.
fn starts_with_bom(buf: &[u8]) -> Option<bool> {
    let n = buf.len().min(BOM.len());
    if buf[..n] != BOM[..n] {
        Some(false)
    } else if n == BOM.len() {
        Some(true)
    } else {
        None
    }
}
