//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Namespace handled by the dispatch core.
    pub scope: ScopeConfig,

    /// Logical backend services.
    pub services: Vec<ServiceConfig>,

    /// Route table mapping path prefixes to services.
    pub routes: Vec<RouteConfig>,

    /// Per-instance circuit breaker tuning.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Active health check settings.
    pub health_check: HealthCheckConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let services = DEFAULT_SERVICES
            .iter()
            .map(|(name, port, _)| ServiceConfig::new(*name, format!("http://localhost:{}", port)))
            .collect();
        let routes = DEFAULT_SERVICES
            .iter()
            .map(|(name, _, prefix)| RouteConfig::new(*prefix, *name))
            .collect();

        Self {
            listener: ListenerConfig::default(),
            scope: ScopeConfig::default(),
            services,
            routes,
            circuit_breaker: CircuitBreakerConfig::default(),
            health_check: HealthCheckConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

/// Built-in services: (name, localhost port, route prefix).
pub const DEFAULT_SERVICES: &[(&str, u16, &str)] = &[
    ("auth", 3001, "/api/auth"),
    ("user", 3002, "/api/users"),
    ("project", 3003, "/api/projects"),
    ("board", 3004, "/api/boards"),
];

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Scope guard for the dispatch core.
///
/// Requests whose path does not start with `namespace` never reach routing;
/// they fall through to the gateway's own handlers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub namespace: String,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            namespace: "/api".to_string(),
        }
    }
}

/// A logical backend service.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Logical service name referenced by routes.
    pub name: String,

    /// Primary instance URL (e.g., "http://localhost:3001").
    pub base_url: String,

    /// Path probed by the active health monitor.
    #[serde(default = "default_health_check_path")]
    pub health_check_path: String,

    /// Deadline for a single forwarded request, in milliseconds.
    #[serde(default = "default_service_timeout_ms")]
    pub timeout_ms: u64,

    /// Additional instance URLs registered alongside `base_url`.
    #[serde(default)]
    pub instances: Vec<String>,
}

impl ServiceConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            health_check_path: default_health_check_path(),
            timeout_ms: default_service_timeout_ms(),
            instances: Vec::new(),
        }
    }
}

fn default_health_check_path() -> String {
    "/health".to_string()
}

fn default_service_timeout_ms() -> u64 {
    5_000
}

/// Route configuration mapping a path prefix to a service.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path prefix to match (case-sensitive).
    pub prefix: String,

    /// Service name to forward to.
    pub service: String,
}

impl RouteConfig {
    pub fn new(prefix: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            service: service.into(),
        }
    }
}

/// Circuit breaker tuning.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,

    /// How long an open breaker rejects traffic, in milliseconds.
    pub open_timeout_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            open_timeout_ms: 30_000,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Health check interval in seconds.
    pub interval_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 10,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:3100".to_string(),
        }
    }
}
