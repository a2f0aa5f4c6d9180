//! Configuration loading from disk or the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::{GatewayConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for environment variable {var}")]
    InvalidEnv { var: String, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build configuration from defaults overridden by process environment variables.
pub fn config_from_env() -> Result<GatewayConfig, ConfigError> {
    config_from_lookup(|key| std::env::var(key).ok())
}

/// Build configuration from defaults overridden by `lookup`.
///
/// Per service `NAME` the variables `NAME_SERVICE_URL`, `NAME_SERVICE_HEALTH_PATH`,
/// `NAME_SERVICE_TIMEOUT_MS` and `NAME_SERVICE_INSTANCES` (comma-separated) apply.
pub fn config_from_lookup<F>(lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvSource { lookup };
    let mut config = GatewayConfig::default();

    if let Some(addr) = env.get("GATEWAY_BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(namespace) = env.get("GATEWAY_NAMESPACE") {
        config.scope.namespace = namespace;
    }
    if let Some(secs) = env.parse("GATEWAY_REQUEST_TIMEOUT_SECS")? {
        config.timeouts.request_secs = secs;
    }

    for service in &mut config.services {
        let prefix = format!("{}_SERVICE", service.name.to_uppercase());
        if let Some(url) = env.get(&format!("{}_URL", prefix)) {
            service.base_url = url;
        }
        if let Some(path) = env.get(&format!("{}_HEALTH_PATH", prefix)) {
            service.health_check_path = path;
        }
        if let Some(timeout) = env.parse(&format!("{}_TIMEOUT_MS", prefix))? {
            service.timeout_ms = timeout;
        }
        if let Some(list) = env.get(&format!("{}_INSTANCES", prefix)) {
            service.instances = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
    }

    if let Some(threshold) = env.parse("CIRCUIT_BREAKER_FAILURE_THRESHOLD")? {
        config.circuit_breaker.failure_threshold = threshold;
    }
    if let Some(timeout) = env.parse("CIRCUIT_BREAKER_OPEN_TIMEOUT_MS")? {
        config.circuit_breaker.open_timeout_ms = timeout;
    }

    if let Some(enabled) = env.parse("HEALTH_CHECK_ENABLED")? {
        config.health_check.enabled = enabled;
    }
    if let Some(interval) = env.parse("HEALTH_CHECK_INTERVAL_SECS")? {
        config.health_check.interval_secs = interval;
    }

    if let Some(level) = env.get("LOG_LEVEL") {
        config.observability.log_level = level;
    }
    if let Some(format) = env.get("LOG_FORMAT") {
        config.observability.log_format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => {
                return Err(ConfigError::InvalidEnv {
                    var: "LOG_FORMAT".to_string(),
                    value: format,
                })
            }
        };
    }
    if let Some(enabled) = env.parse("METRICS_ENABLED")? {
        config.observability.metrics_enabled = enabled;
    }
    if let Some(addr) = env.get("METRICS_ADDRESS") {
        config.observability.metrics_address = addr;
    }

    if let Some(enabled) = env.parse("ADMIN_ENABLED")? {
        config.admin.enabled = enabled;
    }
    if let Some(key) = env.get("ADMIN_API_KEY") {
        config.admin.api_key = key;
    }
    if let Some(addr) = env.get("ADMIN_BIND_ADDRESS") {
        config.admin.bind_address = addr;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, var: &str) -> Option<String> {
        (self.lookup)(var).filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr>(&self, var: &str) -> Result<Option<T>, ConfigError> {
        match self.get(var) {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidEnv {
                    var: var.to_string(),
                    value,
                }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_defaults_point_at_localhost() {
        let config = config_from_lookup(lookup_from(&[])).unwrap();
        let auth = config.services.iter().find(|s| s.name == "auth").unwrap();
        assert_eq!(auth.base_url, "http://localhost:3001");
        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.circuit_breaker.open_timeout_ms, 30_000);
    }

    #[test]
    fn test_env_overrides_service_descriptor() {
        let config = config_from_lookup(lookup_from(&[
            ("USER_SERVICE_URL", "http://users.internal:8000"),
            ("USER_SERVICE_HEALTH_PATH", "/status"),
            ("USER_SERVICE_TIMEOUT_MS", "1500"),
            ("USER_SERVICE_INSTANCES", "http://users-2.internal:8000, http://users-3.internal:8000"),
            ("CIRCUIT_BREAKER_FAILURE_THRESHOLD", "5"),
            ("CIRCUIT_BREAKER_OPEN_TIMEOUT_MS", "1000"),
        ]))
        .unwrap();

        let user = config.services.iter().find(|s| s.name == "user").unwrap();
        assert_eq!(user.base_url, "http://users.internal:8000");
        assert_eq!(user.health_check_path, "/status");
        assert_eq!(user.timeout_ms, 1500);
        assert_eq!(user.instances.len(), 2);
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.circuit_breaker.open_timeout_ms, 1000);
    }

    #[test]
    fn test_env_rejects_unparsable_number() {
        let err = config_from_lookup(lookup_from(&[("AUTH_SERVICE_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref var, .. } if var == "AUTH_SERVICE_TIMEOUT_MS"));
    }

    #[test]
    fn test_env_result_is_validated() {
        let err = config_from_lookup(lookup_from(&[("BOARD_SERVICE_URL", "not a url")])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let path = std::env::temp_dir().join(format!("gateway-config-{}.toml", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
            [[services]]
            name = "auth"
            base_url = "http://127.0.0.1:4001"

            [[routes]]
            prefix = "/api/auth"
            service = "auth"
            "#
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.services.len(), 1);
        assert_eq!(config.routes[0].service, "auth");

        fs::remove_file(&path).unwrap();
    }
}
