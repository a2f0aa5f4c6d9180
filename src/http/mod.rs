//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → dispatch middleware (namespace traffic → dispatcher)
//!         → request.rs (rewrite origin, strip hop-by-hop headers)
//!         → upstream instance
//!     → local routes (/health, JSON 404 fallback)
//!     → response.rs (structured error bodies)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{GatewayRequestId, X_REQUEST_ID};
pub use response::ErrorBody;
pub use server::{AppState, HttpServer};
