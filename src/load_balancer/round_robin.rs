//! Round-robin load balancing across service pools.

use dashmap::DashMap;

use crate::load_balancer::{instance::ServiceInstance, pool::ServicePool, LoadBalancer};
use crate::observability::metrics;
use crate::registry::ServiceRegistry;

/// Round-robin selector keyed by service name.
///
/// Each pool sits behind its own shard lock, so cursor updates for one
/// service are atomic without blocking selection for other services.
#[derive(Debug, Default)]
pub struct RoundRobinBalancer {
    pools: DashMap<String, ServicePool>,
}

impl RoundRobinBalancer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one pool per registered service from its descriptor's instance URLs.
    pub fn from_registry(registry: &ServiceRegistry) -> Self {
        let balancer = Self::new();
        for descriptor in registry.descriptors() {
            balancer
                .pools
                .insert(descriptor.name.clone(), ServicePool::new(descriptor.instance_urls.iter().cloned()));
        }
        balancer
    }

    fn set_health(&self, service: &str, url: &str, healthy: bool) {
        let changed = match self.pools.get_mut(service) {
            Some(mut pool) => pool.set_health(url, healthy),
            None => false,
        };

        if changed {
            tracing::debug!(service = %service, instance = %url, healthy, "Instance health updated");
            metrics::record_instance_health(service, url, healthy);
        }
    }
}

impl LoadBalancer for RoundRobinBalancer {
    fn instances(&self, service: &str) -> Vec<ServiceInstance> {
        self.pools
            .get(service)
            .map(|pool| pool.instances().to_vec())
            .unwrap_or_default()
    }

    fn next_instance(&self, service: &str) -> Option<String> {
        // get_mut holds the shard write lock across read-modify-write of the cursor.
        let mut pool = self.pools.get_mut(service)?;
        pool.next()
    }

    fn mark_healthy(&self, service: &str, url: &str) {
        self.set_health(service, url, true);
    }

    fn mark_unhealthy(&self, service: &str, url: &str) {
        self.set_health(service, url, false);
    }

    fn add_instance(&self, service: &str, url: &str) {
        let added = self
            .pools
            .entry(service.to_string())
            .or_default()
            .add(url.to_string());

        if added {
            tracing::info!(service = %service, instance = %url, "Instance registered");
            metrics::record_instance_health(service, url, true);
        }
    }

    fn services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pools.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn balancer_with(service: &str, urls: &[&str]) -> RoundRobinBalancer {
        let lb = RoundRobinBalancer::new();
        for url in urls {
            lb.add_instance(service, url);
        }
        lb
    }

    #[test]
    fn test_round_robin() {
        let lb = balancer_with("user", &["http://a", "http://b", "http://c"]);

        let picks: Vec<_> = (0..4).map(|_| lb.next_instance("user").unwrap()).collect();
        assert_eq!(picks, vec!["http://a", "http://b", "http://c", "http://a"]);
    }

    #[test]
    fn test_unknown_service() {
        let lb = RoundRobinBalancer::new();
        assert!(lb.instances("ghost").is_empty());
        assert_eq!(lb.next_instance("ghost"), None);
        // No-op, must not create the service.
        lb.mark_unhealthy("ghost", "http://a");
        assert!(lb.services().is_empty());
    }

    #[test]
    fn test_mark_unhealthy_and_back() {
        let lb = balancer_with("user", &["http://a", "http://b"]);
        lb.mark_unhealthy("user", "http://a");
        assert_eq!(lb.next_instance("user").as_deref(), Some("http://b"));
        assert_eq!(lb.next_instance("user").as_deref(), Some("http://b"));

        lb.mark_unhealthy("user", "http://b");
        assert_eq!(lb.next_instance("user"), None);
        assert_eq!(lb.instances("user").len(), 2);

        lb.mark_healthy("user", "http://a");
        assert_eq!(lb.next_instance("user").as_deref(), Some("http://a"));
    }

    #[test]
    fn test_add_instance_appends_in_order() {
        let lb = balancer_with("board", &["http://a"]);
        lb.add_instance("board", "http://b");
        lb.add_instance("board", "http://a");

        let urls: Vec<_> = lb.instances("board").into_iter().map(|i| i.url).collect();
        assert_eq!(urls, vec!["http://a", "http://b"]);
        assert!(lb.instances("board").iter().all(|i| i.healthy));
    }

    #[test]
    fn test_from_registry() {
        let mut user = ServiceConfig::new("user", "http://localhost:3002");
        user.instances.push("http://localhost:3012".into());
        let registry = ServiceRegistry::from_config(&[user, ServiceConfig::new("auth", "http://localhost:3001")]);

        let lb = RoundRobinBalancer::from_registry(&registry);
        assert_eq!(lb.services(), vec!["auth".to_string(), "user".to_string()]);
        assert_eq!(lb.instances("user").len(), 2);
    }

    #[test]
    fn test_concurrent_selection_is_fair() {
        let lb = Arc::new(balancer_with("user", &["http://a", "http://b", "http://c"]));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let lb = lb.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| lb.next_instance("user").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for handle in handles {
            for url in handle.join().unwrap() {
                *counts.entry(url).or_default() += 1;
            }
        }

        // 600 selections over 3 instances: no cursor update lost or duplicated.
        assert_eq!(counts.len(), 3);
        assert!(counts.values().all(|&c| c == 200));
    }
}
