//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build the registry, route table, balancer and breaker table in dependency order
//! - Wire them into a dispatcher
//! - Apply reloaded configuration atomically
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - No process-wide singletons; every gateway owns its own state
//! - Reload swaps the route table and registry; instances are only ever added

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::config::validation::validate_config;
use crate::config::{ConfigError, GatewayConfig};
use crate::dispatch::{Dispatcher, HyperTransport, Transport};
use crate::load_balancer::{LoadBalancer, RoundRobinBalancer};
use crate::registry::ServiceRegistry;
use crate::resilience::BreakerTable;
use crate::routing::{PrefixRouter, RouteError, SharedRouter};

/// Errors building or reloading a gateway.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Route(#[from] RouteError),
}

/// All dispatch state of one gateway process.
#[derive(Debug)]
pub struct Gateway {
    pub config: ArcSwap<GatewayConfig>,
    pub router: Arc<SharedRouter>,
    pub registry: Arc<ArcSwap<ServiceRegistry>>,
    pub balancer: Arc<RoundRobinBalancer>,
    pub breakers: Arc<BreakerTable>,
    pub dispatcher: Dispatcher,
}

impl Gateway {
    /// Build a gateway forwarding over HTTP.
    pub fn build(config: GatewayConfig) -> Result<Self, StartupError> {
        Self::with_transport(config, Arc::new(HyperTransport::new()))
    }

    /// Build a gateway forwarding through `transport`.
    pub fn with_transport(config: GatewayConfig, transport: Arc<dyn Transport>) -> Result<Self, StartupError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let registry = ServiceRegistry::from_config(&config.services);
        let router = Arc::new(SharedRouter::new(PrefixRouter::from_config(&config.routes)?));
        let balancer = Arc::new(RoundRobinBalancer::from_registry(&registry));
        let breakers = Arc::new(BreakerTable::from_config(&config.circuit_breaker));
        let registry = Arc::new(ArcSwap::from_pointee(registry));

        let dispatcher = Dispatcher::new(
            config.scope.namespace.clone(),
            router.clone(),
            registry.clone(),
            balancer.clone(),
            breakers.clone(),
            transport,
        )
        .with_request_timeout(Duration::from_secs(config.timeouts.request_secs));

        tracing::info!(
            services = registry.load().len(),
            routes = router.route_count(),
            namespace = %config.scope.namespace,
            failure_threshold = breakers.failure_threshold(),
            open_timeout_ms = breakers.open_timeout().as_millis() as u64,
            "Gateway initialized"
        );

        Ok(Self {
            config: ArcSwap::from_pointee(config),
            router,
            registry,
            balancer,
            breakers,
            dispatcher,
        })
    }

    /// Apply a new configuration.
    ///
    /// Route table and registry are replaced as whole snapshots. Instance URLs
    /// new to a service are appended; existing instances, their health and
    /// their breakers are kept. Every other section is bound at startup and
    /// keeps its current value until restart.
    pub fn apply_reload(&self, mut config: GatewayConfig) -> Result<(), StartupError> {
        // Validate against the timeouts and namespace actually in force.
        keep_startup_sections(&self.config.load(), &mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;

        let router = PrefixRouter::from_config(&config.routes)?;
        let registry = ServiceRegistry::from_config(&config.services);

        for descriptor in registry.descriptors() {
            for url in &descriptor.instance_urls {
                self.balancer.add_instance(&descriptor.name, url);
            }
        }

        tracing::info!(services = registry.len(), routes = router.len(), "Configuration reloaded");

        self.router.replace(router);
        self.registry.store(Arc::new(registry));
        self.config.store(Arc::new(config));
        Ok(())
    }
}

/// Copy the sections that only apply at startup from `current` into `next`,
/// warning about each one the new file tried to change.
fn keep_startup_sections(current: &GatewayConfig, next: &mut GatewayConfig) {
    let mut ignored = Vec::new();

    macro_rules! keep {
        ($($section:ident),+) => {
            $(
                if current.$section != next.$section {
                    ignored.push(stringify!($section));
                }
                next.$section = current.$section.clone();
            )+
        };
    }
    keep!(listener, scope, circuit_breaker, health_check, timeouts, observability, admin);

    if !ignored.is_empty() {
        tracing::warn!(sections = ?ignored, "Changed sections require restart; keeping current values");
    }
}
