//! Line framing for the inbound byte stream.
//!
//! The controllers speak newline-delimited text (raw lines or NDJSON). The
//! serial layer delivers arbitrary chunks, so a [`LineFramer`] buffers the
//! partial tail between reads and hands back whole lines.

/// Splits a chunked byte stream into newline-delimited lines.
///
/// Lines end at `\n`; a `\r` immediately before the terminator is stripped,
/// so both bare-LF and CRLF senders work. The buffer is byte-based: a
/// multi-byte UTF-8 character split across two reads is reassembled before
/// the completed line is decoded (lossily) to text.
///
/// One framer serves exactly one connection. Create a fresh one (or call
/// [`reset`](LineFramer::reset)) whenever a new connection opens so no
/// partial line leaks across connections.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        LineFramer { buffer: Vec::new() }
    }

    /// Ingest a chunk and return every line it completed, in order.
    ///
    /// The trailing partial segment (if any) stays buffered for the next
    /// call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                if self.buffer.last() == Some(&b'\r') {
                    self.buffer.pop();
                }
                lines.push(String::from_utf8_lossy(&self.buffer).into_owned());
                self.buffer.clear();
            } else {
                self.buffer.push(byte);
            }
        }
        lines
    }

    /// Drain the pending partial line at end of stream.
    ///
    /// Returns `None` when nothing is buffered. The buffer is empty
    /// afterwards either way.
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        Some(line)
    }

    /// Discard any buffered partial line.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Number of buffered bytes awaiting a terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
