//! MJPEG-over-HTTP camera stream client
//!
//! Connects to the long-lived `multipart/x-mixed-replace` streams served
//! by IP cameras and fans the JPEG frames out to any number of
//! subscribers over a single upstream connection.
//!
//! # Architecture
//!
//! ```text
//!   upstream camera ──HTTP GET──► MultipartStream
//!                                       │ parts
//!                                       ▼
//!                                  reader task ──► last frame, stats
//!                                       │ Frame { number, bytes }
//!                                       ▼
//!                         ┌─────────────┼─────────────┐
//!                         ▼             ▼             ▼
//!                   [Subscription] [Subscription] [Subscription]
//!                      recv()         recv()         recv()
//! ```
//!
//! The connection exists exactly while at least one subscriber exists:
//! the first `subscribe` opens it, the last `unsubscribe` closes it. With
//! reconnect enabled, a retry loop re-establishes dead connections and a
//! watchdog forces a reconnect when frames stop arriving on a socket
//! that never reports an error.
//!
//! # Example
//!
//! ```no_run
//! use mjpeg_rs::{Camera, CameraConfig};
//!
//! # async fn example() -> mjpeg_rs::Result<()> {
//! let camera = Camera::new(
//!     CameraConfig::new("porch", "http://192.168.1.20/video.mjpg")
//!         .credentials("admin", "hunter2")
//!         .reconnect(true),
//! );
//!
//! let mut sub = camera.subscribe().await?;
//! while let Some(frame) = sub.recv().await {
//!     println!("[{}] frame {} ({} bytes)", frame.camera, frame.number, frame.size());
//! }
//!
//! camera.unsubscribe(sub.id()).await;
//! # Ok(())
//! # }
//! ```

pub mod camera;
pub mod error;
pub mod multipart;
pub mod registry;
pub mod stats;

mod source;

pub use camera::{Camera, CameraConfig, ConnectionState};
pub use error::{Error, ProtocolError, ReadError, Result, TransportError};
pub use registry::{Frame, SubscriberId, Subscription};
pub use stats::CameraStats;
