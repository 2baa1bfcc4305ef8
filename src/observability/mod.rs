//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events; captured per invocation)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → the invocation's log accumulator (see telemetry::capture)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - One tracing subscriber for the process; the capture layer is part of it
//! - Metrics are cheap (atomic increments)
//! - The metrics endpoint is optional

pub mod logging;
pub mod metrics;
