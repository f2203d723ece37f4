//! Connection lifecycle state

use std::fmt;

/// State of a camera's upstream connection
///
/// ```text
/// Idle ──subscribe──► Connecting ──► Streaming ──stream death──► Reconnecting
///  ▲                                     │                            │
///  │                                     │                            │
///  └──── last unsubscribe / stop ────────┴────────────────────────────┘
/// ```
///
/// `Reconnecting` only occurs with reconnect enabled; otherwise stream
/// death goes straight back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No stream, no subscribers
    Idle,
    /// First subscriber arrived; connection being established
    Connecting,
    /// Reader loop active, frames flowing
    Streaming,
    /// Stream died; retry loop active
    Reconnecting,
}

impl ConnectionState {
    /// Whether an upstream connection is currently open
    pub fn is_streaming(&self) -> bool {
        *self == ConnectionState::Streaming
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Streaming => "streaming",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(s)
    }
}
