//! Per-connection frame pump
//!
//! Exactly one reader task exists per open connection. It drains parts
//! from the multipart stream, wraps them into frames with a sequence
//! number scoped to this connection, and hands them to the camera for
//! fan-out. Any termination, clean or not, funnels into the camera's
//! reader-exit path, which decides between reconnect and teardown.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::camera::Camera;
use crate::multipart::MultipartStream;
use crate::registry::Frame;

use super::connection::BodyStream;

/// How often per-connection throughput is reported when logging is on.
const THROUGHPUT_WINDOW: Duration = Duration::from_secs(60);

/// Spawn the reader task for a freshly opened connection.
pub(crate) fn spawn(camera: &Arc<Camera>, parts: MultipartStream<BodyStream>, epoch: u64) {
    let camera = Arc::clone(camera);
    tokio::spawn(async move {
        run(&camera, parts).await;
        camera.on_reader_exit(epoch).await;
    });
}

async fn run(camera: &Arc<Camera>, mut parts: MultipartStream<BodyStream>) {
    let log = camera.config().log;
    let mut window_start = Instant::now();
    let mut window_frames = 0u64;

    for number in 0u64.. {
        let part = match parts.next_part().await {
            Ok(Some(part)) => part,
            Ok(None) => {
                if log {
                    tracing::info!(camera = %camera.name(), "end of stream");
                }
                return;
            }
            // A failed drain is fatal to this connection; there is no
            // per-frame recovery within one epoch.
            Err(e) => {
                tracing::warn!(camera = %camera.name(), error = %e, "stream read failed");
                return;
            }
        };

        let frame = Frame::new(camera.name_arc(), number, part.data);
        camera.counters().record_frame(frame.size());
        camera.store_last_frame(frame.clone()).await;
        camera.emit(frame).await;

        if log {
            window_frames += 1;
            if window_start.elapsed() >= THROUGHPUT_WINDOW {
                tracing::info!(
                    camera = %camera.name(),
                    frames = window_frames,
                    window = ?window_start.elapsed(),
                    "throughput"
                );
                window_start = Instant::now();
                window_frames = 0;
            }
        }
    }
}
