//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe every instance at url + health_check_path
//!     → 2xx: mark healthy, anything else: mark unhealthy
//!     → Load balancer selection sees the new flags
//! ```
//!
//! # Design Decisions
//! - Disabled by default; flags otherwise only change through the admin API
//! - Health is per instance and independent of circuit breakers
//! - One probe result flips the flag (no flap damping)

pub mod active;

pub use active::HealthMonitor;
