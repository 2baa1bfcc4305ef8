//! Per-invocation log accumulation and delivery.
//!
//! # Data Flow
//! ```text
//! Invocation starts:
//!     origin.rs (request or scheduled trigger → default meta + host label)
//!     → accumulator.rs (LogAccumulator::new, tags from tags.rs)
//!     → capture.rs (accumulator registered for the invocation's task)
//!
//! During the invocation:
//!     tracing::info!/warn!/... → capture layer → entries
//!     explicit log()/set_meta()/set_tag() → entries / extra meta / tags
//!
//! Invocation ends:
//!     accumulator.flush() → ingest.rs (one POST of {"lines": [...]})
//!     run detached; the response path never waits on it
//! ```
//!
//! # Design Decisions
//! - Extra meta is merged into a line when the line is appended
//! - Execution time is stamped onto every line at flush
//! - Capture is scoped to the invocation's task, never process-wide
//! - Delivery is best-effort: one attempt, failures logged and swallowed

pub mod accumulator;
pub mod capture;
pub mod entry;
pub mod ingest;
pub mod origin;
pub mod tags;

pub use accumulator::LogAccumulator;
pub use capture::CaptureLayer;
pub use entry::{LogData, LogLine, Severity};
pub use ingest::{IngestClient, IngestError};
pub use origin::{Origin, RequestInfo, SCHEDULED_HOST_LABEL};
pub use tags::parse_tags;
