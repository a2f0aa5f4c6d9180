//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe service instances
//! - Update instance health flags in the load balancer

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::Request;
use futures_util::future::join_all;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::lifecycle::ShutdownSignal;
use crate::load_balancer::LoadBalancer;
use crate::registry::ServiceRegistry;

pub struct HealthMonitor {
    balancer: Arc<dyn LoadBalancer>,
    registry: Arc<ArcSwap<ServiceRegistry>>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(
        balancer: Arc<dyn LoadBalancer>,
        registry: Arc<ArcSwap<ServiceRegistry>>,
        config: HealthCheckConfig,
    ) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            balancer,
            registry,
            config,
            client,
        }
    }

    pub async fn run(self, mut shutdown: ShutdownSignal) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(interval = self.config.interval_secs, "Health monitor starting");

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every instance of every service once, all probes in flight together.
    pub async fn check_all(&self) {
        // Services registered at runtime have no descriptor; probe them with defaults.
        let registry = self.registry.load_full();

        let mut targets = Vec::new();
        for service in self.balancer.services() {
            let (path, timeout) = match registry.get(&service) {
                Some(d) => (d.health_check_path.clone(), d.timeout()),
                None => ("/health".to_string(), Duration::from_millis(5_000)),
            };
            for instance in self.balancer.instances(&service) {
                targets.push((service.clone(), instance.url, path.clone(), timeout));
            }
        }

        let results = join_all(targets.into_iter().map(|(service, url, path, timeout)| async move {
            let healthy = self.probe(&url, &path, timeout).await;
            (service, url, healthy)
        }))
        .await;

        for (service, url, healthy) in results {
            if healthy {
                self.balancer.mark_healthy(&service, &url);
            } else {
                self.balancer.mark_unhealthy(&service, &url);
            }
        }
    }

    async fn probe(&self, url: &str, path: &str, timeout: Duration) -> bool {
        let uri = format!("{}{}", url.trim_end_matches('/'), path);

        let request = match Request::builder()
            .method("GET")
            .uri(&uri)
            .header("user-agent", "service-gateway-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(uri = %uri, error = %e, "Failed to build health check request");
                return false;
            }
        };

        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::warn!(uri = %uri, status = %response.status(), "Health check failed: non-success status");
                }
                success
            }
            Ok(Err(e)) => {
                tracing::warn!(uri = %uri, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!(uri = %uri, "Health check failed: timeout");
                false
            }
        }
    }
}
