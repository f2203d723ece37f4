//! Subscriber table and subscription handle

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use super::frame::{Frame, SubscriberId};

/// Receiving end of one subscription
///
/// Frames arrive in the order they were read from the upstream. `recv`
/// returning `None` means the queue was closed: the subscriber was
/// unsubscribed, or the camera was torn down for good.
///
/// Dropping a `Subscription` does not remove the registration; pass its
/// id to `Camera::unsubscribe` for that.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Frame>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, rx: mpsc::Receiver<Frame>) -> Self {
        Self { id, rx }
    }

    /// The handle identifying this subscription
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next frame. `None` signals closure.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Take a frame without waiting.
    pub fn try_recv(&mut self) -> Result<Frame, TryRecvError> {
        self.rx.try_recv()
    }
}

/// The registry data structure: subscriber handle to outbound queue
///
/// Holds no lock of its own; every mutation and every snapshot happens
/// under the owning camera's lock.
#[derive(Debug, Default)]
pub struct SubscriberTable {
    queues: HashMap<SubscriberId, mpsc::Sender<Frame>>,
    next_id: u64,
}

impl SubscriberTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber with a bounded queue.
    pub fn insert(&mut self, capacity: usize) -> Subscription {
        let id = SubscriberId::new(self.next_id);
        self.next_id += 1;

        let (tx, rx) = mpsc::channel(capacity);
        self.queues.insert(id, tx);
        Subscription::new(id, rx)
    }

    /// Remove a subscriber, closing its queue. Returns whether the handle
    /// was registered.
    pub fn remove(&mut self, id: SubscriberId) -> bool {
        self.queues.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Capture the current queues for delivery outside the lock.
    ///
    /// Emission works off this snapshot, so a queue removed after the
    /// snapshot sees at most one extra send, which fails harmlessly on
    /// the closed channel.
    pub fn snapshot(&self) -> Vec<mpsc::Sender<Frame>> {
        self.queues.values().cloned().collect()
    }

    /// Drop every queue, closing each exactly once.
    pub fn clear(&mut self) {
        self.queues.clear();
    }
}
