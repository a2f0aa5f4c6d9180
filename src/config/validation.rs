//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing services)
//! - Validate value ranges (timeouts > 0, threshold > 0)
//! - Detect conflicting routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("scope namespace '{0}' must start with '/'")]
    InvalidNamespace(String),

    #[error("service '{0}' is defined more than once")]
    DuplicateService(String),

    #[error("service '{service}' has invalid instance URL '{url}'")]
    InvalidUrl { service: String, url: String },

    #[error("service '{0}' must have a timeout greater than zero")]
    ZeroTimeout(String),

    #[error("service '{service}' timeout of {timeout_ms}ms must be shorter than the {request_ms}ms request timeout")]
    TimeoutExceedsRequest {
        service: String,
        timeout_ms: u64,
        request_ms: u64,
    },

    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,

    #[error("route prefix '{0}' is defined more than once")]
    DuplicatePrefix(String),

    #[error("route prefix '{0}' must start with '/'")]
    InvalidPrefix(String),

    #[error("route '{prefix}' references unknown service '{service}'")]
    UnknownService { prefix: String, service: String },

    #[error("circuit breaker failure threshold must be greater than zero")]
    ZeroFailureThreshold,

    #[error("health check interval must be greater than zero")]
    ZeroHealthInterval,
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.scope.namespace.starts_with('/') {
        errors.push(ValidationError::InvalidNamespace(config.scope.namespace.clone()));
    }

    let request_ms = config.timeouts.request_secs.saturating_mul(1_000);
    if request_ms == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    let mut service_names = HashSet::new();
    for service in &config.services {
        if !service_names.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }
        if service.timeout_ms == 0 {
            errors.push(ValidationError::ZeroTimeout(service.name.clone()));
        }
        // The forward must expire before the inbound request timeout does.
        if request_ms > 0 && service.timeout_ms >= request_ms {
            errors.push(ValidationError::TimeoutExceedsRequest {
                service: service.name.clone(),
                timeout_ms: service.timeout_ms,
                request_ms,
            });
        }
        for url in std::iter::once(&service.base_url).chain(service.instances.iter()) {
            if !is_valid_instance_url(url) {
                errors.push(ValidationError::InvalidUrl {
                    service: service.name.clone(),
                    url: url.clone(),
                });
            }
        }
    }

    let mut prefixes = HashSet::new();
    for route in &config.routes {
        if !route.prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPrefix(route.prefix.clone()));
        }
        if !prefixes.insert(route.prefix.as_str()) {
            errors.push(ValidationError::DuplicatePrefix(route.prefix.clone()));
        }
        if !service_names.contains(route.service.as_str()) {
            errors.push(ValidationError::UnknownService {
                prefix: route.prefix.clone(),
                service: route.service.clone(),
            });
        }
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::ZeroFailureThreshold);
    }

    if config.health_check.enabled && config.health_check.interval_secs == 0 {
        errors.push(ValidationError::ZeroHealthInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Instances must be absolute plain-http URLs with a host; forwarding does not speak TLS.
pub fn is_valid_instance_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => url.scheme() == "http" && url.host_str().is_some(),
        Err(_) => false,
    }
}
