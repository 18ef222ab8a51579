//! Line framing for the read side of a connection

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::protocol::constants::DEFAULT_MAX_LINE_LEN;

/// Reads newline-terminated text lines
///
/// Either `\n` or `\r\n` is accepted and stripped. A line longer than
/// `max_line_len` bytes is returned in pieces of at most that length; the
/// terminator that follows the last full piece belongs to that piece and never
/// shows up as an extra empty line.
/// Invalid UTF-8 is replaced rather than rejected.
///
/// `read_line` is cancel safe: bytes already pulled off the socket stay in the
/// internal buffer and are picked up by the next call.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
    max_line_len: usize,
    /// Last returned piece filled the limit without reaching a terminator
    after_full_piece: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Create a reader with the default line limit
    pub fn new(inner: R) -> Self {
        Self::with_max_line_len(inner, DEFAULT_MAX_LINE_LEN)
    }

    /// Create a reader with a custom line limit
    pub fn with_max_line_len(inner: R, max_line_len: usize) -> Self {
        Self {
            inner: BufReader::new(inner),
            buf: Vec::new(),
            max_line_len: max_line_len.max(1),
            after_full_piece: false,
        }
    }

    /// Read the next line
    ///
    /// Returns `Ok(None)` once the peer has closed the connection and no
    /// partial line is pending. A final unterminated line is still returned.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if !self.fill_piece().await? {
                return Ok(None);
            }

            let bare_terminator = matches!(self.buf.as_slice(), b"\n" | b"\r\n");
            if self.after_full_piece && bare_terminator {
                // Ends the piece already returned
                self.buf.clear();
                self.after_full_piece = false;
                continue;
            }

            self.after_full_piece =
                self.buf.len() >= self.max_line_len && self.buf.last() != Some(&b'\n');

            let line = decode_line(&self.buf);
            self.buf.clear();
            return Ok(Some(line));
        }
    }

    // Fill `buf` with one raw piece: up to and including `\n`, or up to the
    // limit. Returns `false` at EOF with nothing pending.
    async fn fill_piece(&mut self) -> io::Result<bool> {
        loop {
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                return Ok(!self.buf.is_empty());
            }

            let room = self.max_line_len - self.buf.len();
            // One extra byte so a terminator right at the limit is seen
            let window = &available[..available.len().min(room + 1)];

            if let Some(pos) = window.iter().position(|&b| b == b'\n') {
                self.buf.extend_from_slice(&window[..=pos]);
                self.inner.consume(pos + 1);
                return Ok(true);
            }

            let taken = window.len().min(room);
            self.buf.extend_from_slice(&window[..taken]);
            self.inner.consume(taken);

            if self.buf.len() >= self.max_line_len {
                return Ok(true);
            }
        }
    }

    /// Consume the reader, returning the underlying stream
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    while end > 0 && matches!(raw[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
