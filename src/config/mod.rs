//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → env.rs (EDGE_RELAY_* overrides, highest priority)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → shared via Arc to the server and scheduler
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The ingestion key may be absent at load; invocations are refused
//!   until it is set

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, ConfigError};
pub use schema::{
    IngestConfig, ListenerConfig, ObservabilityConfig, RelayConfig, ScheduleConfig,
    UpstreamConfig,
};
