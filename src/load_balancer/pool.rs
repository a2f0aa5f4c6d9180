//! Per-service instance pool.
//!
//! # Responsibilities
//! - Hold the ordered instance list of one service
//! - Own the round-robin cursor for that service
//! - Flip health flags and append new instances

use crate::load_balancer::instance::ServiceInstance;

/// Instances of one service plus its round-robin cursor.
#[derive(Debug, Clone, Default)]
pub struct ServicePool {
    instances: Vec<ServiceInstance>,
    cursor: usize,
}

impl ServicePool {
    /// Create a pool of healthy instances in the given order.
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut pool = Self::default();
        for url in urls {
            pool.add(url.into());
        }
        pool
    }

    pub fn instances(&self) -> &[ServiceInstance] {
        &self.instances
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Select the next healthy instance and advance the cursor.
    ///
    /// The cycle length is the healthy count at the moment of selection, so
    /// health changes between calls shift the rotation.
    pub fn next(&mut self) -> Option<String> {
        let healthy: Vec<&ServiceInstance> = self.instances.iter().filter(|i| i.healthy).collect();
        if healthy.is_empty() {
            return None;
        }

        // Cursor may point past the end after the healthy set shrank.
        let index = self.cursor % healthy.len();
        let url = healthy[index].url.clone();
        self.cursor = (index + 1) % healthy.len();
        Some(url)
    }

    /// Set the health flag of `url`. Returns false if the instance is unknown.
    pub fn set_health(&mut self, url: &str, healthy: bool) -> bool {
        match self.instances.iter_mut().find(|i| i.url == url) {
            Some(instance) => {
                instance.healthy = healthy;
                true
            }
            None => false,
        }
    }

    /// Append a healthy instance. Returns false if `url` is already present.
    pub fn add(&mut self, url: String) -> bool {
        if self.instances.iter().any(|i| i.url == url) {
            return false;
        }
        self.instances.push(ServiceInstance::new(url));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_in_insertion_order() {
        let mut pool = ServicePool::new(["a", "b", "c"]);
        let picks: Vec<_> = (0..4).map(|_| pool.next().unwrap()).collect();
        assert_eq!(picks, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_skips_unhealthy() {
        let mut pool = ServicePool::new(["a", "b", "c"]);
        assert!(pool.set_health("b", false));
        let picks: Vec<_> = (0..4).map(|_| pool.next().unwrap()).collect();
        assert_eq!(picks, vec!["a", "c", "a", "c"]);
    }

    #[test]
    fn test_cursor_wraps_when_healthy_set_shrinks() {
        let mut pool = ServicePool::new(["a", "b", "c"]);
        pool.next();
        pool.next();
        assert_eq!(pool.cursor(), 2);

        pool.set_health("a", false);
        pool.set_health("b", false);
        // Cursor 2 against one healthy instance.
        assert_eq!(pool.next().as_deref(), Some("c"));
        assert_eq!(pool.cursor(), 0);
    }

    #[test]
    fn test_all_unhealthy_returns_none() {
        let mut pool = ServicePool::new(["a"]);
        pool.set_health("a", false);
        assert_eq!(pool.next(), None);
    }

    #[test]
    fn test_add_and_unknown_url() {
        let mut pool = ServicePool::new(["a"]);
        assert!(pool.add("b".into()));
        assert!(!pool.add("a".into()));
        assert!(!pool.set_health("zzz", false));
        assert_eq!(pool.instances().len(), 2);
    }
}
