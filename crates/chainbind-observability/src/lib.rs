//! # chainbind-observability
//!
//! OpenTelemetry-based observability for ChainBind.
//!
//! ## Built-in metrics
//! - `chainbind.calls` / `chainbind.call_errors`: counters, tagged with method
//! - `chainbind.call_latency_ms`: histogram
//! - `chainbind.logs_fetched`: histogram of historical query sizes
//! - `chainbind.events_delivered`: counter, tagged with event
//! - `chainbind.subscriptions_opened` / `chainbind.subscriptions_ended`: counters, the latter tagged with outcome
//!
//! ## Structured logging
//! JSON or human-readable logs through `tracing-subscriber`, with levels
//! configurable per crate.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::BindingMetrics;
pub use tracing_setup::{init_tracing, LogConfig};
