//! Camera handle: subscriber fan-out and connection lifecycle
//!
//! A [`Camera`] multiplexes one upstream MJPEG connection to any number
//! of subscribers. The connection exists exactly while the registry is
//! non-empty: the first `subscribe` opens it, the last `unsubscribe` (or
//! `stop`) closes it.
//!
//! Every mutation of the registry and of the stream handle happens under
//! one lock, so the 0→1 and 1→0 subscriber transitions are atomic with
//! the connect/teardown they trigger. Frame delivery captures the queue
//! list under that lock and sends outside of it.

pub mod config;
pub mod state;

pub use config::CameraConfig;
pub use state::ConnectionState;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::error::Result;
use crate::registry::{Frame, SubscriberId, SubscriberTable, Subscription};
use crate::source::connection::{self, StreamHandle};
use crate::source::{reader, supervisor};
use crate::stats::{CameraStats, StatsCounters};

/// Mutable connection state, guarded by the camera lock
pub(crate) struct Shared {
    pub(crate) table: SubscriberTable,
    pub(crate) handle: Option<StreamHandle>,
    pub(crate) state: ConnectionState,
    /// Bumped per connection; lets a superseded reader's exit path detect
    /// that a newer connection owns the camera.
    pub(crate) epoch: u64,
}

/// Client for one MJPEG camera stream
///
/// ```no_run
/// use mjpeg_rs::{Camera, CameraConfig};
///
/// # async fn example() -> mjpeg_rs::Result<()> {
/// let camera = Camera::new(
///     CameraConfig::new("porch", "http://192.168.1.20/video.mjpg").reconnect(true),
/// );
///
/// let mut sub = camera.subscribe().await?;
/// while let Some(frame) = sub.recv().await {
///     println!("frame {} ({} bytes)", frame.number, frame.size());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Camera {
    config: CameraConfig,
    name: Arc<str>,
    shared: Mutex<Shared>,
    last_frame: RwLock<Option<Frame>>,
    /// Set by `stop`; permanently disables reconnection.
    stopped: AtomicBool,
    /// Single-flight latch for the watchdog loop.
    pub(crate) watchdog_live: AtomicBool,
    /// Single-flight latch for the reconnect loop.
    pub(crate) reconnect_live: AtomicBool,
    counters: StatsCounters,
}

impl Camera {
    /// Create a camera. No connection is opened until the first
    /// subscriber arrives.
    pub fn new(config: CameraConfig) -> Arc<Self> {
        let name = Arc::from(config.name.as_str());
        Arc::new(Self {
            name,
            config,
            shared: Mutex::new(Shared {
                table: SubscriberTable::new(),
                handle: None,
                state: ConnectionState::Idle,
                epoch: 0,
            }),
            last_frame: RwLock::new(None),
            stopped: AtomicBool::new(false),
            watchdog_live: AtomicBool::new(false),
            reconnect_live: AtomicBool::new(false),
            counters: StatsCounters::default(),
        })
    }

    /// The camera's name, as attached to its frames
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configuration the camera was built with
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Current connection state
    pub async fn state(&self) -> ConnectionState {
        self.shared.lock().await.state
    }

    /// Most recently received frame, if any
    pub async fn last_frame(&self) -> Option<Frame> {
        self.last_frame.read().await.clone()
    }

    /// Throughput counters
    pub fn stats(&self) -> CameraStats {
        self.counters.snapshot()
    }

    /// Register a new subscriber.
    ///
    /// On the 0→1 subscriber transition this opens the upstream
    /// connection. If that connect fails and reconnect is disabled, the
    /// registration is rolled back and the error returned; with reconnect
    /// enabled the subscription stays registered, the failure is logged,
    /// and the retry loop brings the stream up in the background.
    pub async fn subscribe(self: &Arc<Self>) -> Result<Subscription> {
        let mut shared = self.shared.lock().await;
        let was_empty = shared.table.is_empty();
        let sub = shared.table.insert(self.config.queue_capacity);
        self.counters.set_subscribers(shared.table.len());

        if was_empty {
            shared.state = ConnectionState::Connecting;
            if let Err(e) = self.start_locked(&mut shared).await {
                if self.reconnect_enabled() {
                    tracing::warn!(
                        camera = %self.name,
                        error = %e,
                        "initial connect failed, retrying in background"
                    );
                    shared.state = ConnectionState::Reconnecting;
                    drop(shared);
                    supervisor::spawn_reconnect(self);
                } else {
                    shared.table.remove(sub.id());
                    self.counters.set_subscribers(shared.table.len());
                    shared.state = ConnectionState::Idle;
                    return Err(e);
                }
            }
        }

        Ok(sub)
    }

    /// Remove a subscriber, closing its queue. Returns whether the handle
    /// was registered. The 1→0 transition tears the connection down.
    pub async fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut shared = self.shared.lock().await;
        if !shared.table.remove(id) {
            return false;
        }
        self.counters.set_subscribers(shared.table.len());

        if shared.table.is_empty() {
            close_stream(&mut shared);
            if self.config.log {
                tracing::info!(camera = %self.name, "last subscriber left, stream closed");
            }
        }
        true
    }

    /// Force-terminate: close the stream, drop every subscriber queue,
    /// and permanently disable reconnection.
    pub async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);

        let mut shared = self.shared.lock().await;
        shared.table.clear();
        self.counters.set_subscribers(0);
        close_stream(&mut shared);

        if self.config.log {
            tracing::info!(camera = %self.name, "stopped");
        }
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub(crate) fn reconnect_enabled(&self) -> bool {
        self.config.reconnect && !self.is_stopped()
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub(crate) fn counters(&self) -> &StatsCounters {
        &self.counters
    }

    pub(crate) async fn shared_lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().await
    }

    pub(crate) async fn store_last_frame(&self, frame: Frame) {
        *self.last_frame.write().await = Some(frame);
    }

    /// Open the upstream and hand it to a new reader task. The caller
    /// holds the camera lock; called on the 0→1 transition and by the
    /// retry loop.
    pub(crate) async fn start_locked(self: &Arc<Self>, shared: &mut Shared) -> Result<()> {
        let open = connection::open(&self.config).await?;
        if self.config.log {
            tracing::info!(camera = %self.name, url = %self.config.url, "connected");
        }

        shared.epoch += 1;
        shared.handle = Some(open.handle);
        shared.state = ConnectionState::Streaming;
        reader::spawn(self, open.parts, shared.epoch);
        supervisor::spawn_keepalive(self);
        Ok(())
    }

    /// Force-close the current stream without touching the registry; the
    /// reader observes the failed read and runs its termination path.
    pub(crate) async fn kick_stream(&self) {
        let mut shared = self.shared.lock().await;
        if let Some(handle) = shared.handle.take() {
            handle.close();
        }
    }

    /// Runs on every reader termination: reconnect or tear down.
    pub(crate) async fn on_reader_exit(self: &Arc<Self>, epoch: u64) {
        {
            let mut shared = self.shared.lock().await;
            if shared.epoch != epoch {
                return; // superseded by a newer connection
            }
            if let Some(handle) = shared.handle.take() {
                handle.close();
            }
            if shared.table.is_empty() {
                shared.state = ConnectionState::Idle;
                return;
            }
            if !self.reconnect_enabled() {
                // Closing every queue is the only end-of-stream signal
                // subscribers get.
                shared.table.clear();
                self.counters.set_subscribers(0);
                shared.state = ConnectionState::Idle;
                return;
            }
            shared.state = ConnectionState::Reconnecting;
        }
        supervisor::spawn_reconnect(self);
    }

    /// Deliver a frame to every subscriber queue.
    ///
    /// The queue list is captured under the lock; delivery happens
    /// outside it so a full queue cannot stall registry operations. A
    /// full queue drops the frame for that subscriber only.
    pub(crate) async fn emit(&self, frame: Frame) {
        let queues = self.shared.lock().await.table.snapshot();
        for queue in queues {
            match queue.try_send(frame.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.counters.record_drop();
                    tracing::debug!(
                        camera = %self.name,
                        frame = frame.number,
                        "subscriber queue full, frame dropped"
                    );
                }
                // Concurrent unsubscribe; nothing to deliver to.
                Err(TrySendError::Closed(_)) => {}
            }
        }
    }
}

/// Drop the stream handle, failing any in-flight read.
fn close_stream(shared: &mut Shared) {
    if let Some(handle) = shared.handle.take() {
        handle.close();
    }
    shared.state = ConnectionState::Idle;
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::{sleep, timeout};

    use crate::error::Error;

    const PAYLOAD: &[u8] = b"not really a jpeg";

    /// What one fixture connection serves before hanging up.
    #[derive(Clone, Copy)]
    enum Serve {
        /// `n` full parts, then the closing delimiter
        Frames(usize),
        /// `n` full parts, then half a part, then an abrupt close
        Truncated(usize),
        /// One part, then hold the socket open silently
        Stall,
        /// `n` parts after a delayed body start
        SlowStart(usize),
        /// A response that is not a multipart stream
        WrongType,
    }

    async fn read_request_head(socket: &mut TcpStream) {
        let mut head = Vec::new();
        let mut byte = [0u8; 1];
        while !head.ends_with(b"\r\n\r\n") {
            match socket.read(&mut byte).await {
                Ok(1) => head.extend_from_slice(&byte),
                _ => return,
            }
        }
    }

    async fn write_part(socket: &mut TcpStream, payload: &[u8]) -> std::io::Result<()> {
        let head = format!(
            "--frame\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
            payload.len()
        );
        socket.write_all(head.as_bytes()).await?;
        socket.write_all(payload).await?;
        socket.write_all(b"\r\n").await
    }

    /// Serve the given script on every accepted connection. Returns the
    /// stream URL.
    async fn spawn_fixture(script: Serve) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    read_request_head(&mut socket).await;

                    if matches!(script, Serve::WrongType) {
                        let _ = socket
                            .write_all(
                                b"HTTP/1.1 200 OK\r\n\
                                  Content-Type: text/html\r\n\
                                  Connection: close\r\n\
                                  \r\n\
                                  <html></html>",
                            )
                            .await;
                        return;
                    }

                    let head = "HTTP/1.1 200 OK\r\n\
                        Content-Type: multipart/x-mixed-replace; boundary=frame\r\n\
                        Connection: close\r\n\
                        \r\n";
                    if socket.write_all(head.as_bytes()).await.is_err() {
                        return;
                    }

                    match script {
                        Serve::Frames(n) => {
                            for _ in 0..n {
                                if write_part(&mut socket, PAYLOAD).await.is_err() {
                                    return;
                                }
                            }
                            let _ = socket.write_all(b"--frame--\r\n").await;
                        }
                        Serve::Truncated(n) => {
                            for _ in 0..n {
                                if write_part(&mut socket, PAYLOAD).await.is_err() {
                                    return;
                                }
                            }
                            let _ = socket
                                .write_all(b"--frame\r\nContent-Length: 999\r\n\r\nhalf")
                                .await;
                        }
                        Serve::Stall => {
                            let _ = write_part(&mut socket, PAYLOAD).await;
                            sleep(Duration::from_secs(30)).await;
                        }
                        Serve::SlowStart(n) => {
                            sleep(Duration::from_millis(250)).await;
                            for _ in 0..n {
                                if write_part(&mut socket, PAYLOAD).await.is_err() {
                                    return;
                                }
                                sleep(Duration::from_millis(10)).await;
                            }
                            let _ = socket.write_all(b"--frame--\r\n").await;
                        }
                        Serve::WrongType => unreachable!(),
                    }
                });
            }
        });

        format!("http://{}/stream", addr)
    }

    /// A URL nothing is listening on.
    async fn unreachable_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}/stream", addr)
    }

    #[tokio::test]
    async fn test_distinct_handles_and_unsubscribe() {
        // Unreachable upstream; with reconnect enabled the registrations
        // stick and the retry loop owns recovery.
        let camera = Camera::new(
            CameraConfig::new("cam", unreachable_url().await)
                .reconnect(true)
                .retry_delay(Duration::from_millis(50)),
        );

        let a = camera.subscribe().await.unwrap();
        let b = camera.subscribe().await.unwrap();
        let c = camera.subscribe().await.unwrap();
        assert_ne!(a.id(), b.id());
        assert_ne!(b.id(), c.id());
        assert_ne!(a.id(), c.id());
        assert_eq!(camera.stats().subscribers, 3);

        // Unknown handle: no change.
        assert!(!camera.unsubscribe(SubscriberId::new(999)).await);
        assert_eq!(camera.stats().subscribers, 3);

        assert!(camera.unsubscribe(b.id()).await);
        assert_eq!(camera.stats().subscribers, 2);
        assert!(!camera.unsubscribe(b.id()).await);

        assert!(camera.unsubscribe(a.id()).await);
        assert!(camera.unsubscribe(c.id()).await);
        assert_eq!(camera.stats().subscribers, 0);
        assert_eq!(camera.state().await, ConnectionState::Idle);

        camera.stop().await;
    }

    #[tokio::test]
    async fn test_failed_connect_rolls_back_without_reconnect() {
        let camera = Camera::new(CameraConfig::new("cam", unreachable_url().await));

        let err = camera.subscribe().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(camera.stats().subscribers, 0);
        assert_eq!(camera.state().await, ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_non_multipart_upstream_is_protocol_error() {
        let url = spawn_fixture(Serve::WrongType).await;
        let camera = Camera::new(CameraConfig::new("cam", url));

        let err = camera.subscribe().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert_eq!(camera.stats().subscribers, 0);
    }

    #[tokio::test]
    async fn test_fanout_delivers_every_frame_in_order() {
        let url = spawn_fixture(Serve::SlowStart(4)).await;
        let camera = Camera::new(CameraConfig::new("fanout", url));

        let mut a = camera.subscribe().await.unwrap();
        let mut b = camera.subscribe().await.unwrap();
        assert_ne!(a.id(), b.id());

        for sub in [&mut a, &mut b] {
            for expected in 0..4u64 {
                let frame = timeout(Duration::from_secs(5), sub.recv())
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(frame.number, expected);
                assert_eq!(frame.data.as_ref(), PAYLOAD);
                assert_eq!(&*frame.camera, "fanout");
            }
            // Queue closure is the end-of-stream signal.
            assert!(timeout(Duration::from_secs(5), sub.recv())
                .await
                .unwrap()
                .is_none());
        }

        assert_eq!(camera.stats().frames, 4);
        assert_eq!(camera.stats().subscribers, 0);
        assert_eq!(camera.state().await, ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_closes_queues() {
        let url = spawn_fixture(Serve::Truncated(2)).await;
        let camera = Camera::new(CameraConfig::new("cam", url));

        let mut sub = camera.subscribe().await.unwrap();
        for expected in 0..2u64 {
            let frame = timeout(Duration::from_secs(5), sub.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(frame.number, expected);
        }
        assert!(timeout(Duration::from_secs(5), sub.recv())
            .await
            .unwrap()
            .is_none());
        assert_eq!(camera.state().await, ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_last_unsubscribe_tears_down() {
        let url = spawn_fixture(Serve::Stall).await;
        let camera = Camera::new(CameraConfig::new("cam", url));

        let mut sub = camera.subscribe().await.unwrap();
        let frame = timeout(Duration::from_secs(5), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.number, 0);
        assert_eq!(camera.state().await, ConnectionState::Streaming);

        assert!(camera.unsubscribe(sub.id()).await);
        assert_eq!(camera.state().await, ConnectionState::Idle);
        assert_eq!(camera.stats().subscribers, 0);
        assert!(timeout(Duration::from_secs(5), sub.recv())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_reconnect_across_epochs() {
        let url = spawn_fixture(Serve::Frames(3)).await;
        let camera = Camera::new(
            CameraConfig::new("cam", url)
                .reconnect(true)
                .retry_delay(Duration::from_millis(50)),
        );

        let mut sub = camera.subscribe().await.unwrap();

        // Sequence numbers restart per connection; the queue stays open
        // across the reconnect.
        let mut numbers = Vec::new();
        for _ in 0..6 {
            let frame = timeout(Duration::from_secs(10), sub.recv())
                .await
                .unwrap()
                .unwrap();
            numbers.push(frame.number);
        }
        assert_eq!(numbers, vec![0, 1, 2, 0, 1, 2]);
        assert!(camera.stats().reconnects >= 1);

        camera.stop().await;
        loop {
            match timeout(Duration::from_secs(5), sub.recv()).await.unwrap() {
                Some(_) => continue,
                None => break,
            }
        }
    }

    #[tokio::test]
    async fn test_retry_loop_survives_unreachable_upstream() {
        let camera = Camera::new(
            CameraConfig::new("cam", unreachable_url().await)
                .reconnect(true)
                .retry_delay(Duration::from_millis(30)),
        );

        let _sub = camera.subscribe().await.unwrap();

        sleep(Duration::from_millis(300)).await;
        assert_eq!(camera.state().await, ConnectionState::Reconnecting);
        // Exactly one retry loop is latched no matter how long it fails.
        assert!(camera.reconnect_live.load(Ordering::SeqCst));

        camera.stop().await;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while camera.reconnect_live.load(Ordering::SeqCst) {
            assert!(
                tokio::time::Instant::now() < deadline,
                "retry loop did not exit"
            );
            sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(camera.state().await, ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_watchdog_forces_reconnect_on_stall() {
        let url = spawn_fixture(Serve::Stall).await;
        let camera = Camera::new(
            CameraConfig::new("cam", url)
                .reconnect(true)
                .retry_delay(Duration::from_millis(50))
                .watchdog_interval(Duration::from_millis(150)),
        );

        let mut sub = camera.subscribe().await.unwrap();

        let first = timeout(Duration::from_secs(5), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.number, 0);

        // The upstream goes silent without closing the socket; only the
        // watchdog can recover this.
        let second = timeout(Duration::from_secs(5), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.number, 0);
        assert!(camera.stats().reconnects >= 1);

        camera.stop().await;
    }
}
