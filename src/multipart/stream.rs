//! Incremental multipart part parser
//!
//! Parses parts out of a chunked byte stream without any assumption about
//! how the transport splits chunks: a boundary may straddle two chunks, a
//! chunk may hold several parts. Parts declaring `Content-Length` skip the
//! rolling delimiter scan for the declared span.

use std::io;

use bytes::{Buf, Bytes, BytesMut};
use futures_util::{Stream, StreamExt};

use crate::error::ReadError;

/// Upper bound on a part's header block; anything larger is malformed.
const MAX_HEADER_BLOCK: usize = 8 * 1024;

/// Headers of a single part
#[derive(Debug, Clone, Default)]
pub struct PartHeaders {
    /// Declared media type of the part payload
    pub content_type: Option<String>,
    /// Declared payload length in bytes
    pub content_length: Option<usize>,
}

/// One complete part: headers plus payload
#[derive(Debug, Clone)]
pub struct Part {
    pub headers: PartHeaders,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Before the opening boundary line
    Preamble,
    /// Positioned at the start of a part's header block
    Part,
    /// Closing delimiter or end-of-stream seen
    Done,
}

/// Streaming part iterator over a chunked body
///
/// `next_part` yields `Ok(Some(part))` per part, `Ok(None)` on clean
/// termination (closing delimiter, or the upstream hanging up between
/// parts), and `Err` when the stream dies mid-part or carries garbage.
pub struct MultipartStream<S> {
    body: S,
    /// `--boundary`, the opening delimiter token
    delimiter: Vec<u8>,
    /// `\r\n--boundary`, the token terminating a part body
    terminator: Vec<u8>,
    buf: BytesMut,
    eof: bool,
    state: ParseState,
}

impl<S> MultipartStream<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    pub fn new(body: S, boundary: &str) -> Self {
        Self {
            body,
            delimiter: format!("--{}", boundary).into_bytes(),
            terminator: format!("\r\n--{}", boundary).into_bytes(),
            buf: BytesMut::with_capacity(16 * 1024),
            eof: false,
            state: ParseState::Preamble,
        }
    }

    /// Read the next complete part.
    pub async fn next_part(&mut self) -> Result<Option<Part>, ReadError> {
        loop {
            match self.state {
                ParseState::Done => return Ok(None),
                ParseState::Preamble => {
                    if !self.seek_opening().await? {
                        self.state = ParseState::Done;
                        return Ok(None);
                    }
                }
                ParseState::Part => {
                    // The upstream may simply hang up between parts.
                    if self.buf.is_empty() && !self.fill().await? {
                        self.state = ParseState::Done;
                        return Ok(None);
                    }
                    let headers = self.read_headers().await?;
                    let data = self.read_body(&headers).await?;
                    return Ok(Some(Part { headers, data }));
                }
            }
        }
    }

    /// Pull the next chunk into the buffer. Returns false at end of stream.
    async fn fill(&mut self) -> Result<bool, ReadError> {
        if self.eof {
            return Ok(false);
        }
        match self.body.next().await {
            Some(Ok(chunk)) => {
                self.buf.extend_from_slice(&chunk);
                Ok(true)
            }
            Some(Err(e)) => Err(ReadError::Io(e)),
            None => {
                self.eof = true;
                Ok(false)
            }
        }
    }

    /// Scan the preamble for the opening boundary line, consuming it.
    /// Returns false on clean end-of-stream before any boundary.
    async fn seek_opening(&mut self) -> Result<bool, ReadError> {
        loop {
            if let Some(pos) = find(&self.buf, &self.delimiter) {
                self.buf.advance(pos + self.delimiter.len());
                self.finish_delimiter_line().await?;
                return Ok(true);
            }
            // Keep a tail in case the delimiter straddles chunks.
            let keep = self.delimiter.len().saturating_sub(1);
            if self.buf.len() > keep {
                let excess = self.buf.len() - keep;
                self.buf.advance(excess);
            }
            if !self.fill().await? {
                return Ok(false);
            }
        }
    }

    /// Consume the remainder of a boundary line that was just matched.
    /// `--` right after the token marks the closing delimiter.
    async fn finish_delimiter_line(&mut self) -> Result<(), ReadError> {
        loop {
            if let Some(nl) = self.buf.iter().position(|&b| b == b'\n') {
                let closing = self.buf[..nl].starts_with(b"--");
                self.buf.advance(nl + 1);
                self.state = if closing {
                    ParseState::Done
                } else {
                    ParseState::Part
                };
                return Ok(());
            }
            if self.buf.len() > MAX_HEADER_BLOCK {
                return Err(ReadError::MalformedHeaders);
            }
            if !self.fill().await? {
                // A closing delimiter at end-of-stream may omit its
                // newline; nothing can follow either way.
                self.buf.clear();
                self.state = ParseState::Done;
                return Ok(());
            }
        }
    }

    /// Parse the header block of the current part, up to and including the
    /// blank separator line.
    async fn read_headers(&mut self) -> Result<PartHeaders, ReadError> {
        let mut headers = PartHeaders::default();
        let mut consumed = 0usize;

        loop {
            let nl = loop {
                if let Some(nl) = self.buf.iter().position(|&b| b == b'\n') {
                    break nl;
                }
                if self.buf.len() > MAX_HEADER_BLOCK {
                    return Err(ReadError::MalformedHeaders);
                }
                if !self.fill().await? {
                    return Err(ReadError::TruncatedPart);
                }
            };

            let line = self.buf.split_to(nl + 1);
            let line = trim_line(&line);
            if line.is_empty() {
                return Ok(headers);
            }

            consumed += line.len();
            if consumed > MAX_HEADER_BLOCK {
                return Err(ReadError::MalformedHeaders);
            }

            let line = std::str::from_utf8(line).map_err(|_| ReadError::MalformedHeaders)?;
            let (name, value) = line.split_once(':').ok_or(ReadError::MalformedHeaders)?;
            let value = value.trim();

            if name.trim().eq_ignore_ascii_case("content-type") {
                headers.content_type = Some(value.to_string());
            } else if name.trim().eq_ignore_ascii_case("content-length") {
                headers.content_length = value.parse().ok();
            }
        }
    }

    /// Read the part payload up to the next boundary, consuming the
    /// boundary line behind it.
    async fn read_body(&mut self, headers: &PartHeaders) -> Result<Bytes, ReadError> {
        let mut from = 0usize;

        if let Some(len) = headers.content_length {
            // The terminator starts right at the declared end.
            while self.buf.len() < len {
                if !self.fill().await? {
                    return Err(ReadError::TruncatedPart);
                }
            }
            from = len;
        }

        loop {
            if let Some(rel) = find(&self.buf[from..], &self.terminator) {
                let data = self.buf.split_to(from + rel).freeze();
                self.buf.advance(self.terminator.len());
                self.finish_delimiter_line().await?;
                return Ok(data);
            }
            from = self.buf.len().saturating_sub(self.terminator.len() - 1);
            if !self.fill().await? {
                return Err(ReadError::TruncatedPart);
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn trim_line(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
