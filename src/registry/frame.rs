//! Frame and subscriber handle types

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;

/// Opaque handle identifying one subscriber of one camera
///
/// Handles are allocated monotonically; two handles returned by the same
/// camera are never equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One JPEG frame from a camera stream
///
/// Immutable once created. Cloning is cheap: the payload is
/// reference-counted, not copied.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Name of the camera that produced the frame
    pub camera: Arc<str>,
    /// 0-based frame count within one connection epoch; resets on reconnect
    pub number: u64,
    /// When the frame was read off the stream
    pub received_at: Instant,
    /// Raw JPEG payload
    pub data: Bytes,
}

impl Frame {
    pub(crate) fn new(camera: Arc<str>, number: u64, data: Bytes) -> Self {
        Self {
            camera,
            number,
            received_at: Instant::now(),
            data,
        }
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Time elapsed since the frame was received
    pub fn age(&self) -> Duration {
        self.received_at.elapsed()
    }
}
