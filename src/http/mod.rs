//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, relay handler)
//!     → request.rs (origin headers, absolute URL)
//!     → [telemetry: accumulator built, capture scope entered]
//!     → forward.rs (host/port override)
//!     → upstream.rs (outbound fetch, response back)
//!     → Send to client; log flush continues in the background
//! ```

pub mod forward;
pub mod request;
pub mod server;
pub mod upstream;

pub use forward::forward;
pub use request::{OriginHeaders, RequestError};
pub use server::{AppState, HttpServer, ServerError};
pub use upstream::{UpstreamClient, UpstreamError};
