//! Metrics collection and export for parley.
//!
//! Crates record through the `metrics` facade macros re-exported here, using
//! the names in [`definitions`]. Nothing is recorded until [`init_metrics`]
//! installs a recorder; with the `prometheus` feature the handle renders the
//! Prometheus text format for the gateway's `/metrics` route.
//!
//! ```rust,ignore
//! use parley_metrics::{counter, dispatch};
//!
//! counter!(dispatch::CHUNKS_SUBMITTED_TOTAL).increment(1);
//! ```

mod definitions;
mod error;
mod recorder;

pub use {
    definitions::*,
    error::{Error, Result},
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
