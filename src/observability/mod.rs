//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, exported for Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every log event, never interpolated strings
//! - Request ID flows through all subsystems via tower-http
//! - Metrics are cheap (atomic increments); recording without an installed
//!   recorder is a no-op

pub mod logging;
pub mod metrics;
