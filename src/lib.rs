//! Edge relay library.
//!
//! Forwards each inbound request to an optionally re-pointed destination
//! and ships the invocation's log lines to a log-ingestion endpoint in the
//! background.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod telemetry;

pub use config::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use telemetry::LogAccumulator;
