//! Lightweight in-process metrics.
//!
//! Counters and gauges are stored as atomics and rendered in Prometheus text
//! format by [`metrics::StoreMetrics::render`].

pub mod metrics;

pub use metrics::StoreMetrics;
