//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to instance:
//!     → circuit_breaker.rs (skip instances whose breaker is open)
//!     → timeouts.rs (enforce the service's forwarding deadline)
//!     → outcome reported back to circuit_breaker.rs
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every forwarded call has a deadline
//! - No retries: a failed forward is surfaced to the caller
//! - Breakers are per (service, instance URL), never per service

pub mod circuit_breaker;
pub mod timeouts;

pub use circuit_breaker::{BreakerKey, BreakerSnapshot, BreakerState, BreakerTable};
pub use timeouts::{with_deadline, DeadlineExceeded};

/// Tracks failures per (service, instance) and decides whether to skip an instance.
pub trait CircuitBreaker: Send + Sync + std::fmt::Debug {
    /// Count a failed forward to `url`.
    fn record_failure(&self, service: &str, url: &str);

    /// A successful forward fully heals the breaker.
    fn record_success(&self, service: &str, url: &str);

    /// Whether traffic to `url` must currently be withheld.
    fn is_open(&self, service: &str, url: &str) -> bool;

    /// Manual override back to the initial closed state.
    fn reset(&self, service: &str, url: &str);

    /// All tracked breakers, sorted by key.
    fn snapshot(&self) -> Vec<BreakerSnapshot>;
}
