//! Lock-free throughput counters
//!
//! Updated by the reader and emitter without taking the camera lock; read
//! at any time via `Camera::stats`.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Snapshot of a camera's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraStats {
    /// Frames read from the upstream, across all connection epochs
    pub frames: u64,
    /// Payload bytes read from the upstream
    pub bytes: u64,
    /// Frames dropped because a subscriber queue was full
    pub dropped_frames: u64,
    /// Connections re-established after a stream death
    pub reconnects: u64,
    /// Current subscriber count
    pub subscribers: usize,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    frames: AtomicU64,
    bytes: AtomicU64,
    dropped: AtomicU64,
    reconnects: AtomicU64,
    subscribers: AtomicUsize,
}

impl StatsCounters {
    pub(crate) fn record_frame(&self, size: usize) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_subscribers(&self, count: usize) {
        self.subscribers.store(count, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CameraStats {
        CameraStats {
            frames: self.frames.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            dropped_frames: self.dropped.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            subscribers: self.subscribers.load(Ordering::Relaxed),
        }
    }
}
