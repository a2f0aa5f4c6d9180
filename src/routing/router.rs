//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled prefix routes
//! - Resolve a request path to a service name
//! - Return the matched service or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Routes sorted by prefix length at build time, so first match is the longest
//! - O(n) path prefix scan (acceptable for typical route counts)
//! - Duplicate prefixes rejected when the table is built

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::config::RouteConfig;
use crate::routing::matcher::PathPrefixMatcher;
use crate::routing::Router;

/// Error building a route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route prefix '{0}' is defined more than once")]
    DuplicatePrefix(String),
}

#[derive(Debug, Clone)]
struct CompiledRoute {
    matcher: PathPrefixMatcher,
    service: String,
}

/// Longest-prefix route table.
#[derive(Debug, Clone, Default)]
pub struct PrefixRouter {
    routes: Vec<CompiledRoute>,
}

impl PrefixRouter {
    /// Compile `(prefix, service)` pairs into a router.
    pub fn new<I, P, S>(routes: I) -> Result<Self, RouteError>
    where
        I: IntoIterator<Item = (P, S)>,
        P: Into<String>,
        S: Into<String>,
    {
        let mut compiled: Vec<CompiledRoute> = Vec::new();
        for (prefix, service) in routes {
            let matcher = PathPrefixMatcher::new(prefix);
            if compiled.iter().any(|r| r.matcher == matcher) {
                return Err(RouteError::DuplicatePrefix(matcher.prefix().to_string()));
            }
            compiled.push(CompiledRoute {
                matcher,
                service: service.into(),
            });
        }

        // Most specific first; stable sort keeps config order otherwise.
        compiled.sort_by(|a, b| b.matcher.specificity().cmp(&a.matcher.specificity()));

        Ok(Self { routes: compiled })
    }

    /// Compile the route table from configuration.
    pub fn from_config(routes: &[RouteConfig]) -> Result<Self, RouteError> {
        Self::new(routes.iter().map(|r| (r.prefix.clone(), r.service.clone())))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Router for PrefixRouter {
    fn resolve(&self, path: &str) -> Option<String> {
        self.routes
            .iter()
            .find(|r| r.matcher.matches(path))
            .map(|r| r.service.clone())
    }
}

/// A route table that can be replaced atomically while requests are in flight.
#[derive(Debug)]
pub struct SharedRouter {
    current: ArcSwap<PrefixRouter>,
}

impl SharedRouter {
    pub fn new(router: PrefixRouter) -> Self {
        Self {
            current: ArcSwap::from_pointee(router),
        }
    }

    /// Swap in a new table; in-flight lookups finish against the old one.
    pub fn replace(&self, router: PrefixRouter) {
        self.current.store(std::sync::Arc::new(router));
    }

    pub fn route_count(&self) -> usize {
        self.current.load().len()
    }
}

impl Router for SharedRouter {
    fn resolve(&self, path: &str) -> Option<String> {
        self.current.load().resolve(path)
    }
}
