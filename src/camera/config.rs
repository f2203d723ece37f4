//! Camera configuration

use std::time::Duration;

/// Configuration for a single camera stream
///
/// `name` and `url` are required; everything else has a default. Builder
/// methods consume and return `self` for chaining.
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Label attached to every frame from this camera
    pub name: String,

    /// Stream source URL
    pub url: String,

    /// Optional basic-auth username
    pub username: Option<String>,

    /// Optional basic-auth password
    pub password: Option<String>,

    /// Re-establish the connection automatically when the stream dies
    pub reconnect: bool,

    /// Emit per-connection diagnostics (connect/reconnect notices,
    /// per-minute throughput); warnings are emitted regardless
    pub log: bool,

    /// HTTP connect timeout
    pub connect_timeout: Duration,

    /// Fixed delay between reconnect attempts
    pub retry_delay: Duration,

    /// Watchdog interval: the stream is force-reconnected when no frame
    /// arrived within this window
    pub watchdog_interval: Duration,

    /// Capacity of each subscriber queue, in pending frames
    pub queue_capacity: usize,
}

impl CameraConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            username: None,
            password: None,
            reconnect: false,
            log: false,
            connect_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_secs(3),
            watchdog_interval: Duration::from_secs(10),
            queue_capacity: 20,
        }
    }

    /// Set basic-auth credentials
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Enable or disable automatic reconnection
    pub fn reconnect(mut self, enabled: bool) -> Self {
        self.reconnect = enabled;
        self
    }

    /// Enable or disable per-connection diagnostics
    pub fn log(mut self, enabled: bool) -> Self {
        self.log = enabled;
        self
    }

    /// Set the HTTP connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the delay between reconnect attempts
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the watchdog interval for stall detection
    pub fn watchdog_interval(mut self, interval: Duration) -> Self {
        self.watchdog_interval = interval;
        self
    }

    /// Set the subscriber queue capacity (minimum 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CameraConfig::new("porch", "http://example/stream");

        assert_eq!(config.name, "porch");
        assert_eq!(config.url, "http://example/stream");
        assert!(config.username.is_none());
        assert!(!config.reconnect);
        assert!(!config.log);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.retry_delay, Duration::from_secs(3));
        assert_eq!(config.watchdog_interval, Duration::from_secs(10));
        assert_eq!(config.queue_capacity, 20);
    }

    #[test]
    fn test_builder_chaining() {
        let config = CameraConfig::new("porch", "http://example/stream")
            .credentials("admin", "secret")
            .reconnect(true)
            .log(true)
            .connect_timeout(Duration::from_secs(5))
            .retry_delay(Duration::from_millis(500))
            .watchdog_interval(Duration::from_secs(30))
            .queue_capacity(8);

        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert!(config.reconnect);
        assert!(config.log);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.retry_delay, Duration::from_millis(500));
        assert_eq!(config.watchdog_interval, Duration::from_secs(30));
        assert_eq!(config.queue_capacity, 8);
    }

    #[test]
    fn test_queue_capacity_floor() {
        let config = CameraConfig::new("cam", "http://example").queue_capacity(0);
        assert_eq!(config.queue_capacity, 1);
    }
}
