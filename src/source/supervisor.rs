//! Reconnect and keepalive loops
//!
//! Both loops are single-flight per camera (a latch makes re-entrant
//! spawns no-ops) and bound to the camera's lifetime: they exit when the
//! camera is stopped or its registry empties.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::time::sleep;

use crate::camera::{Camera, ConnectionState};

/// Spawn the retry loop for a dead connection. No-op when one is already
/// running.
pub(crate) fn spawn_reconnect(camera: &Arc<Camera>) {
    if camera
        .reconnect_live
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return;
    }
    let camera = Arc::clone(camera);
    tokio::spawn(async move { run_reconnect(&camera).await });
}

async fn run_reconnect(camera: &Arc<Camera>) {
    if camera.config().log {
        tracing::info!(camera = %camera.name(), "reconnecting");
    }

    loop {
        sleep(camera.config().retry_delay).await;

        let mut shared = camera.shared_lock().await;
        if camera.is_stopped()
            || shared.table.is_empty()
            || shared.state != ConnectionState::Reconnecting
        {
            if shared.state == ConnectionState::Reconnecting {
                shared.state = ConnectionState::Idle;
            }
            // Release the latch while still holding the lock: anything
            // that could spawn a replacement loop must acquire it first.
            camera.reconnect_live.store(false, Ordering::SeqCst);
            return;
        }

        match camera.start_locked(&mut shared).await {
            Ok(()) => {
                camera.counters().record_reconnect();
                camera.reconnect_live.store(false, Ordering::SeqCst);
                return;
            }
            Err(e) => {
                tracing::warn!(camera = %camera.name(), error = %e, "reconnect attempt failed");
            }
        }
    }
}

/// Spawn the stall watchdog. No-op when one is already running or when
/// reconnect is disabled.
///
/// The watchdog is the only mechanism that recovers a connection whose
/// peer stopped sending parts without closing the socket.
pub(crate) fn spawn_keepalive(camera: &Arc<Camera>) {
    if !camera.reconnect_enabled() {
        return;
    }
    if camera
        .watchdog_live
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return;
    }
    let camera = Arc::clone(camera);
    tokio::spawn(async move { run_keepalive(&camera).await });
}

async fn run_keepalive(camera: &Arc<Camera>) {
    let interval = camera.config().watchdog_interval;

    loop {
        sleep(interval).await;

        {
            let shared = camera.shared_lock().await;
            if camera.is_stopped() || shared.table.is_empty() {
                camera.watchdog_live.store(false, Ordering::SeqCst);
                return;
            }
            if shared.state != ConnectionState::Streaming {
                continue;
            }
        }

        let stale = match camera.last_frame().await {
            Some(frame) => frame.age() > interval,
            None => false,
        };
        if stale {
            tracing::warn!(
                camera = %camera.name(),
                "no frame within the watchdog interval, forcing reconnect"
            );
            camera.kick_stream().await;
        }
    }
}
