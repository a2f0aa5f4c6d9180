//! Circuit breaker for instance protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: instance assumed down, skipped during selection
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold
//! Open → Closed: success recorded, manual reset, or a read after open_timeout
//! ```
//!
//! # Design Decisions
//! - Per-instance circuit breaker (one bad instance leaves siblings alone)
//! - Entries created lazily on first failure, never deleted
//! - No half-open probe: once the window elapses the next read closes the breaker
//! - A single success clears the failure count entirely

use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;
use crate::resilience::CircuitBreaker;

/// Identifies one breaker: a service and one of its instance URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BreakerKey {
    pub service: String,
    pub url: String,
}

impl BreakerKey {
    pub fn new(service: &str, url: &str) -> Self {
        Self {
            service: service.to_string(),
            url: url.to_string(),
        }
    }
}

/// Failure bookkeeping for one breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BreakerState {
    pub failure_count: u32,
    pub last_failure_at: Option<Instant>,
    pub open: bool,
}

/// Point-in-time view of a breaker, for the admin API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub service: String,
    pub url: String,
    pub failure_count: u32,
    pub open: bool,
    /// Milliseconds until an open breaker is allowed to close.
    pub open_remaining_ms: Option<u64>,
}

/// Breaker states keyed by (service, instance URL).
#[derive(Debug)]
pub struct BreakerTable {
    entries: DashMap<BreakerKey, BreakerState>,
    failure_threshold: u32,
    open_timeout: Duration,
}

impl BreakerTable {
    pub fn new(failure_threshold: u32, open_timeout: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            failure_threshold: failure_threshold.max(1),
            open_timeout,
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(config.failure_threshold, Duration::from_millis(config.open_timeout_ms))
    }

    /// Raw state of a breaker, if one has been created.
    pub fn state(&self, service: &str, url: &str) -> Option<BreakerState> {
        self.entries.get(&BreakerKey::new(service, url)).map(|e| *e)
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn open_timeout(&self) -> Duration {
        self.open_timeout
    }

    fn window_elapsed(&self, state: &BreakerState) -> bool {
        match state.last_failure_at {
            Some(at) => at.elapsed() > self.open_timeout,
            None => true,
        }
    }
}

impl Default for BreakerTable {
    fn default() -> Self {
        Self::from_config(&CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker for BreakerTable {
    fn record_failure(&self, service: &str, url: &str) {
        let tripped = {
            let mut state = self.entries.entry(BreakerKey::new(service, url)).or_default();
            state.failure_count = state.failure_count.saturating_add(1);
            state.last_failure_at = Some(Instant::now());

            if !state.open && state.failure_count >= self.failure_threshold {
                state.open = true;
                Some(state.failure_count)
            } else {
                None
            }
        };

        if let Some(failures) = tripped {
            tracing::warn!(
                service = %service,
                instance = %url,
                failures,
                open_ms = self.open_timeout.as_millis() as u64,
                "Circuit opened"
            );
            metrics::record_breaker_state(service, url, true);
        }
    }

    fn record_success(&self, service: &str, url: &str) {
        let was_open = match self.entries.get_mut(&BreakerKey::new(service, url)) {
            Some(mut state) => {
                let was_open = state.open;
                *state = BreakerState::default();
                was_open
            }
            None => false,
        };

        if was_open {
            tracing::info!(service = %service, instance = %url, "Circuit closed after success");
            metrics::record_breaker_state(service, url, false);
        }
    }

    fn is_open(&self, service: &str, url: &str) -> bool {
        let closed_by_timeout = {
            let Some(mut state) = self.entries.get_mut(&BreakerKey::new(service, url)) else {
                return false;
            };
            if !state.open {
                return false;
            }
            if !self.window_elapsed(&state) {
                return true;
            }
            *state = BreakerState::default();
            true
        };

        if closed_by_timeout {
            tracing::info!(service = %service, instance = %url, "Circuit closed after open window elapsed");
            metrics::record_breaker_state(service, url, false);
        }
        false
    }

    fn reset(&self, service: &str, url: &str) {
        if let Some(mut state) = self.entries.get_mut(&BreakerKey::new(service, url)) {
            *state = BreakerState::default();
        }
        tracing::info!(service = %service, instance = %url, "Circuit manually reset");
        metrics::record_breaker_state(service, url, false);
    }

    fn snapshot(&self) -> Vec<BreakerSnapshot> {
        let mut entries: Vec<(BreakerKey, BreakerState)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        entries
            .into_iter()
            .map(|(key, state)| {
                let open_remaining_ms = match (state.open, state.last_failure_at) {
                    (true, Some(at)) => Some(self.open_timeout.saturating_sub(at.elapsed()).as_millis() as u64),
                    _ => None,
                };
                BreakerSnapshot {
                    service: key.service,
                    url: key.url,
                    failure_count: state.failure_count,
                    open: state.open,
                    open_remaining_ms,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVC: &str = "user";
    const URL: &str = "http://localhost:3002";

    fn breaker() -> BreakerTable {
        BreakerTable::new(3, Duration::from_millis(30_000))
    }

    fn trip(cb: &BreakerTable) {
        for _ in 0..3 {
            cb.record_failure(SVC, URL);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_threshold() {
        let cb = breaker();
        assert!(!cb.is_open(SVC, URL));

        cb.record_failure(SVC, URL);
        cb.record_failure(SVC, URL);
        assert!(!cb.is_open(SVC, URL));

        cb.record_failure(SVC, URL);
        assert!(cb.is_open(SVC, URL));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closes_after_open_window() {
        let cb = breaker();
        trip(&cb);

        tokio::time::advance(Duration::from_millis(29_000)).await;
        assert!(cb.is_open(SVC, URL));

        tokio::time::advance(Duration::from_millis(2_000)).await;
        assert!(!cb.is_open(SVC, URL));
        // The read reset the entry.
        assert_eq!(cb.state(SVC, URL), Some(BreakerState::default()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_fully_heals() {
        let cb = breaker();
        trip(&cb);
        assert!(cb.is_open(SVC, URL));

        cb.record_success(SVC, URL);
        assert!(!cb.is_open(SVC, URL));

        cb.record_failure(SVC, URL);
        assert!(!cb.is_open(SVC, URL));
        assert_eq!(cb.state(SVC, URL).unwrap().failure_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_reset() {
        let cb = breaker();
        trip(&cb);
        cb.reset(SVC, URL);
        assert!(!cb.is_open(SVC, URL));
        assert_eq!(cb.state(SVC, URL), Some(BreakerState::default()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_closed_entry_is_noop() {
        let cb = breaker();
        cb.record_success(SVC, URL);
        assert_eq!(cb.state(SVC, URL), None);
        assert!(cb.snapshot().is_empty());

        cb.record_failure(SVC, URL);
        cb.record_success(SVC, URL);
        let healed = cb.state(SVC, URL);
        cb.record_success(SVC, URL);
        assert_eq!(cb.state(SVC, URL), healed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_isolated_per_instance() {
        let cb = breaker();
        trip(&cb);
        assert!(cb.is_open(SVC, URL));
        assert!(!cb.is_open(SVC, "http://localhost:3012"));
        assert!(!cb.is_open("auth", URL));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_while_open_extends_window() {
        let cb = breaker();
        trip(&cb);

        tokio::time::advance(Duration::from_millis(20_000)).await;
        cb.record_failure(SVC, URL);

        tokio::time::advance(Duration::from_millis(20_000)).await;
        assert!(cb.is_open(SVC, URL));
        assert_eq!(cb.state(SVC, URL).unwrap().failure_count, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot() {
        let cb = breaker();
        trip(&cb);
        cb.record_failure("auth", "http://localhost:3001");

        tokio::time::advance(Duration::from_millis(10_000)).await;

        let snap = cb.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].service, "auth");
        assert!(!snap[0].open);
        assert_eq!(snap[0].open_remaining_ms, None);
        assert_eq!(snap[1].service, "user");
        assert!(snap[1].open);
        assert_eq!(snap[1].open_remaining_ms, Some(20_000));
    }

    #[test]
    fn test_from_config() {
        let cb = BreakerTable::from_config(&CircuitBreakerConfig {
            failure_threshold: 5,
            open_timeout_ms: 1_000,
        });
        assert_eq!(cb.failure_threshold(), 5);
        assert_eq!(cb.open_timeout(), Duration::from_secs(1));
    }
}
