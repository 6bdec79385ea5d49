//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! gate middleware / forwarding handler produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (decision counters, latency histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (when enabled)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log event of a request
//! - Metrics are cheap atomic updates; recording without an installed
//!   exporter is a no-op

pub mod logging;
pub mod metrics;
