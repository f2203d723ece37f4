//! Upstream stream handling
//!
//! `connection` opens and validates the HTTP stream, `reader` pumps parts
//! into frames, `supervisor` owns the reconnect and watchdog loops.

pub(crate) mod connection;
pub(crate) mod reader;
pub(crate) mod supervisor;
