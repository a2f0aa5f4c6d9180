//! The dispatch orchestrator.
//!
//! # Responsibilities
//! - Apply the namespace scope guard
//! - Resolve service, select an instance whose breaker is closed
//! - Forward through the transport and report the outcome to the breaker
//! - Convert every failure into the structured error body

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::response::IntoResponse;

use crate::dispatch::error::DispatchError;
use crate::dispatch::transport::Transport;
use crate::http::request::{request_id, upstream_request};
use crate::load_balancer::LoadBalancer;
use crate::observability::metrics;
use crate::registry::ServiceRegistry;
use crate::resilience::CircuitBreaker;
use crate::routing::Router;

/// Deadline used when a routed service has no descriptor (e.g. registered at runtime).
pub const DEFAULT_FORWARD_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Headroom kept between the forward deadline and the inbound request timeout.
pub const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_millis(50);

/// Result of handing a request to the dispatcher.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The request was inside the namespace and has been answered.
    Handled(Response<Body>),
    /// The request is outside the namespace; returned untouched.
    PassThrough(Request<Body>),
}

/// Composes router, load balancer, breaker and transport into one pipeline.
#[derive(Debug)]
pub struct Dispatcher {
    namespace: String,
    router: Arc<dyn Router>,
    registry: Arc<ArcSwap<ServiceRegistry>>,
    balancer: Arc<dyn LoadBalancer>,
    breakers: Arc<dyn CircuitBreaker>,
    transport: Arc<dyn Transport>,
    max_deadline: Option<Duration>,
    dispatched: AtomicU64,
}

impl Dispatcher {
    pub fn new(
        namespace: impl Into<String>,
        router: Arc<dyn Router>,
        registry: Arc<ArcSwap<ServiceRegistry>>,
        balancer: Arc<dyn LoadBalancer>,
        breakers: Arc<dyn CircuitBreaker>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            namespace: namespace.into().trim_end_matches('/').to_string(),
            router,
            registry,
            balancer,
            breakers,
            transport,
            max_deadline: None,
            dispatched: AtomicU64::new(0),
        }
    }

    /// Cap every forward deadline below the inbound request timeout, so an
    /// upstream expiry is always observed here rather than by the outer layer.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.max_deadline = Some(request_timeout.saturating_sub(REQUEST_TIMEOUT_MARGIN));
        self
    }

    /// Number of requests handled inside the namespace.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Whether `path` falls inside the proxied namespace, on a segment boundary.
    pub fn in_scope(&self, path: &str) -> bool {
        match path.strip_prefix(self.namespace.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Dispatch one request.
    pub async fn dispatch(&self, request: Request<Body>) -> DispatchOutcome {
        if !self.in_scope(request.uri().path()) {
            return DispatchOutcome::PassThrough(request);
        }

        self.dispatched.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let req_id = request_id(request.headers()).to_string();

        let (service, response) = match self.forward(request).await {
            Ok(forwarded) => forwarded,
            Err(err) => {
                match &err {
                    DispatchError::UpstreamTransportFailure { service, url, source } => {
                        tracing::error!(
                            request_id = %req_id,
                            method = %method,
                            path = %path,
                            service = %service,
                            target = %url,
                            error = %source,
                            "Upstream request failed"
                        );
                    }
                    other => {
                        tracing::warn!(
                            request_id = %req_id,
                            method = %method,
                            path = %path,
                            error = %other,
                            "Dispatch rejected"
                        );
                    }
                }
                let service = err.service().unwrap_or("none").to_string();
                (service, err.to_body(&method, &path).into_response())
            }
        };

        metrics::record_request(method.as_str(), response.status().as_u16(), &service, start);
        DispatchOutcome::Handled(response)
    }

    /// First instance of `service` whose breaker is closed.
    ///
    /// Probes at most as many candidates as the service has instances, so the
    /// loop terminates even when every breaker is open.
    pub fn select_target(&self, service: &str) -> Result<String, DispatchError> {
        let instances = self.balancer.instances(service);
        if instances.is_empty() {
            return Err(DispatchError::NoInstancesConfigured {
                service: service.to_string(),
            });
        }

        for _ in 0..instances.len() {
            let Some(url) = self.balancer.next_instance(service) else {
                break;
            };
            if !self.breakers.is_open(service, &url) {
                return Ok(url);
            }
            tracing::debug!(service = %service, instance = %url, "Skipping instance with open circuit");
        }

        Err(DispatchError::AllCircuitsOpen {
            service: service.to_string(),
        })
    }

    fn deadline_for(&self, service: &str) -> Duration {
        let deadline = self
            .registry
            .load()
            .get(service)
            .map(|d| d.timeout())
            .unwrap_or(DEFAULT_FORWARD_TIMEOUT);
        match self.max_deadline {
            Some(max) => deadline.min(max),
            None => deadline,
        }
    }

    async fn forward(&self, request: Request<Body>) -> Result<(String, Response<Body>), DispatchError> {
        let service = self
            .router
            .resolve(request.uri().path())
            .ok_or_else(|| DispatchError::NoRouteFound {
                path: request.uri().path().to_string(),
            })?;

        let target = self.select_target(&service)?;
        let deadline = self.deadline_for(&service);

        tracing::debug!(
            request_id = %request_id(request.headers()),
            service = %service,
            target = %target,
            deadline_ms = deadline.as_millis() as u64,
            "Forwarding request"
        );

        let outcome = match upstream_request(request, &target) {
            Ok(upstream) => self.transport.forward(upstream, deadline).await,
            Err(invalid) => Err(invalid.into()),
        };

        match outcome {
            Ok(response) => {
                self.breakers.record_success(&service, &target);
                Ok((service, response))
            }
            Err(source) => {
                self.breakers.record_failure(&service, &target);
                Err(DispatchError::UpstreamTransportFailure {
                    service,
                    url: target,
                    source,
                })
            }
        }
    }
}
