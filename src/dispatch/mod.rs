//! Request dispatch core.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → scope guard (outside namespace: hand back untouched)
//!     → Router::resolve (path → service)
//!     → LoadBalancer::next_instance (bounded by instance count)
//!     → CircuitBreaker::is_open (skip open instances)
//!     → Transport::forward (with the service's deadline)
//!     → CircuitBreaker::record_success / record_failure
//!     → upstream response or structured JSON error
//! ```
//!
//! # Design Decisions
//! - Components are trait objects so tests can swap in fakes
//! - No lock is held across the upstream await
//! - Single attempt per request; no redispatch to a sibling instance

pub mod dispatcher;
pub mod error;
pub mod transport;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::DispatchError;
pub use transport::{HyperTransport, Transport, TransportError};
