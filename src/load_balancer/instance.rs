//! Service instance abstraction.

use serde::Serialize;

/// One concrete network endpoint implementing a logical service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInstance {
    /// Base URL (scheme + authority) of the instance.
    pub url: String,
    /// Whether the instance may be selected.
    pub healthy: bool,
}

impl ServiceInstance {
    /// Create a new instance; instances start healthy.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            healthy: true,
        }
    }
}
