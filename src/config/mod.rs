//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or environment
//!     → loader.rs (parse & deserialize, apply env overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → route table + service registry built from it
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of route table and registry
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{config_from_env, load_config, ConfigError};
pub use schema::{
    AdminConfig, CircuitBreakerConfig, GatewayConfig, HealthCheckConfig, ListenerConfig,
    LogFormat, ObservabilityConfig, RouteConfig, ScopeConfig, ServiceConfig,
};
pub use validation::ValidationError;
pub use watcher::ConfigWatcher;
