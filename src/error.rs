//! Error types for the MJPEG client
//!
//! Errors are split by phase: `TransportError` for connection
//! establishment, `ProtocolError` for an unusable upstream response, and
//! `ReadError` for failures while draining parts from an open stream.
//!
//! During an active streaming epoch errors never reach subscribers as
//! values; subscribers only observe the absence of further frames. The one
//! exception is the subscriber whose `subscribe` call triggered the
//! connection attempt, which receives the failure as a return value.

use std::fmt;
use std::io;

/// Convenience result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// The HTTP connection could not be established
    Transport(TransportError),
    /// The upstream response is not a usable multipart stream
    Protocol(ProtocolError),
    /// A part failed to drain mid-stream
    Read(ReadError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(e) => write!(f, "transport error: {}", e),
            Error::Protocol(e) => write!(f, "protocol error: {}", e),
            Error::Read(e) => write!(f, "read error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(e) => Some(e),
            Error::Protocol(e) => Some(e),
            Error::Read(e) => Some(e),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<ReadError> for Error {
    fn from(e: ReadError) -> Self {
        Error::Read(e)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(TransportError::Http(e))
    }
}

/// Connection establishment failures
#[derive(Debug)]
pub enum TransportError {
    /// Request construction or connection failure
    Http(reqwest::Error),
    /// The server answered with a non-success status
    Status(u16),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Http(e) => write!(f, "{}", e),
            TransportError::Status(code) => write!(f, "unexpected HTTP status {}", code),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Http(e) => Some(e),
            TransportError::Status(_) => None,
        }
    }
}

/// The upstream declared something the client cannot stream from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The response carried no parsable `Content-Type` header
    MissingContentType,
    /// The declared content type is not a multipart kind
    NotMultipart(String),
    /// A multipart content type without a `boundary` parameter
    MissingBoundary(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::MissingContentType => write!(f, "response has no content type"),
            ProtocolError::NotMultipart(ct) => {
                write!(f, "non-multipart content type: {}", ct)
            }
            ProtocolError::MissingBoundary(ct) => {
                write!(f, "multipart content type without boundary: {}", ct)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Failures while draining parts from an open stream
///
/// Any of these is fatal to the current connection epoch and triggers the
/// same termination path as a clean end-of-stream.
#[derive(Debug)]
pub enum ReadError {
    /// Body I/O failed mid-part
    Io(io::Error),
    /// The stream ended in the middle of a part
    TruncatedPart,
    /// Part headers exceeded the size cap or were not valid header lines
    MalformedHeaders,
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Io(e) => write!(f, "{}", e),
            ReadError::TruncatedPart => write!(f, "stream ended mid-part"),
            ReadError::MalformedHeaders => write!(f, "malformed part headers"),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Io(e) => Some(e),
            _ => None,
        }
    }
}
