//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Logging → Metrics → Clients → Scheduler → Listener
//!
//! Background work (background.rs):
//!     Detached log flushes registered per invocation
//!
//! Scheduled trigger (scheduled.rs):
//!     Interval tick → scheduled invocation → background flush
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → stop accepting → drain in-flight flushes → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Pending log deliveries are awaited before the process exits

pub mod background;
pub mod scheduled;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use background::BackgroundTasks;
pub use scheduled::Scheduler;
pub use shutdown::Shutdown;
