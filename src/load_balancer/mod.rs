//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → service name identified
//!     → round_robin.rs (look up the service's pool)
//!     → pool.rs (filter healthy instances, advance cursor)
//!     → instance.rs (instance URL + health flag)
//!     → Return instance URL or None
//! ```
//!
//! # Design Decisions
//! - One pool per service; each pool owns its instances and cursor
//! - Round robin runs over the healthy subset at selection time
//! - Unhealthy instances excluded from selection
//! - Instances may be appended at runtime, never removed

pub mod instance;
pub mod pool;
pub mod round_robin;

pub use instance::ServiceInstance;
pub use pool::ServicePool;
pub use round_robin::RoundRobinBalancer;

/// Selects instances of a logical service.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Current instance list for `service`; empty if the service is unknown.
    fn instances(&self, service: &str) -> Vec<ServiceInstance>;

    /// Next healthy instance URL in round-robin order.
    fn next_instance(&self, service: &str) -> Option<String>;

    /// Mark an instance healthy. No-op if absent.
    fn mark_healthy(&self, service: &str, url: &str);

    /// Mark an instance unhealthy. No-op if absent.
    fn mark_unhealthy(&self, service: &str, url: &str);

    /// Register a new healthy instance, creating the service if needed.
    fn add_instance(&self, service: &str, url: &str);

    /// Known service names, sorted.
    fn services(&self) -> Vec<String>;
}
