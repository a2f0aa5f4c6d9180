//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate prefix)
//!     → Return: service name or None
//!
//! Route Compilation (at startup / reload):
//!     RouteConfig[]
//!     → Reject duplicate prefixes
//!     → Sort by prefix length (longest first)
//!     → Freeze as immutable PrefixRouter
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use matcher::PathPrefixMatcher;
pub use router::{PrefixRouter, RouteError, SharedRouter};

/// Maps a request path to a logical service name.
pub trait Router: Send + Sync + std::fmt::Debug {
    /// Returns the service owning `path`, or `None` if no route matches.
    fn resolve(&self, path: &str) -> Option<String>;
}
