//! Static catalog of logical backend services.
//!
//! # Responsibilities
//! - Hold one `ServiceDescriptor` per logical service
//! - Provide per-service forwarding deadlines and health-check paths
//! - Seed the load balancer with each service's initial instances
//!
//! # Design Decisions
//! - Immutable after construction; reload builds a new registry and swaps it
//! - Lookups by name are O(1)

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use crate::config::ServiceConfig;

/// Connection info for one logical service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub base_url: String,
    pub health_check_path: String,
    pub timeout_ms: u64,
    /// Every instance URL known at load time, `base_url` first.
    pub instance_urls: Vec<String>,
}

impl ServiceDescriptor {
    /// Deadline applied to a single forwarded request.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl From<&ServiceConfig> for ServiceDescriptor {
    fn from(config: &ServiceConfig) -> Self {
        let mut instance_urls = vec![config.base_url.clone()];
        for url in &config.instances {
            if !instance_urls.contains(url) {
                instance_urls.push(url.clone());
            }
        }

        Self {
            name: config.name.clone(),
            base_url: config.base_url.clone(),
            health_check_path: config.health_check_path.clone(),
            timeout_ms: config.timeout_ms,
            instance_urls,
        }
    }
}

/// Immutable snapshot of all service descriptors.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, ServiceDescriptor>,
}

impl ServiceRegistry {
    /// Build a registry from service configuration.
    ///
    /// Later duplicates replace earlier ones; validation rejects duplicates before this point.
    pub fn from_config(configs: &[ServiceConfig]) -> Self {
        let services = configs
            .iter()
            .map(|c| (c.name.clone(), ServiceDescriptor::from(c)))
            .collect();
        Self { services }
    }

    pub fn get(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.get(name)
    }

    /// Descriptors sorted by service name.
    pub fn descriptors(&self) -> Vec<&ServiceDescriptor> {
        let mut all: Vec<_> = self.services.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
