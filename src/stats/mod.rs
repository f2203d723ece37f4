//! Camera statistics

pub mod metrics;

pub use metrics::CameraStats;
pub(crate) use metrics::StatsCounters;
