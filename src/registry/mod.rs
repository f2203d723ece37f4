//! Subscriber registry and frame fan-out
//!
//! Each camera owns one registry: a map from subscriber handle to a
//! bounded outbound queue. Every frame read from the upstream is fanned
//! out to all registered queues.
//!
//! ```text
//!                          Camera
//!                  ┌─────────────────────┐
//!                  │ SubscriberTable {   │
//!                  │   id -> mpsc::Tx,   │
//!                  │ }                   │
//!                  └──────────┬──────────┘
//!                             │ snapshot under the lock,
//!                             │ try_send outside it
//!          ┌──────────────────┼──────────────────┐
//!          ▼                  ▼                  ▼
//!    [Subscription]     [Subscription]     [Subscription]
//!       recv()             recv()             recv()
//! ```
//!
//! # Zero-copy design
//!
//! `Frame` payloads are `bytes::Bytes`, so fanning a frame out to N
//! subscribers clones a reference count, not the JPEG data.
//!
//! # Delivery policy
//!
//! Delivery is non-blocking: a subscriber whose queue is full has that
//! frame dropped (and counted), so one slow consumer can never stall the
//! reader or starve the other subscribers. Queues closed by a concurrent
//! unsubscribe are skipped silently.

pub mod frame;
pub mod store;

pub use frame::{Frame, SubscriberId};
pub use store::{SubscriberTable, Subscription};
