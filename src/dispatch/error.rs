//! Dispatch failure taxonomy.

use axum::http::{Method, StatusCode};
use thiserror::Error;

use crate::dispatch::transport::TransportError;
use crate::http::response::ErrorBody;

/// Why a request inside the proxied namespace could not be served by an upstream.
///
/// None of these are retried. Each converts to the structured JSON error body.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The path matches no route prefix.
    #[error("No route configured for path {path}")]
    NoRouteFound { path: String },

    /// The service resolved but has no registered instances.
    #[error("No instances configured for service '{service}'")]
    NoInstancesConfigured { service: String },

    /// Every instance was skipped: breaker open or instance unhealthy.
    #[error("All instances of service '{service}' are unavailable (circuit open or unhealthy)")]
    AllCircuitsOpen { service: String },

    /// The selected instance did not produce a response.
    #[error("{source}")]
    UpstreamTransportFailure {
        service: String,
        url: String,
        source: TransportError,
    },
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::NoRouteFound { .. } => StatusCode::BAD_GATEWAY,
            DispatchError::NoInstancesConfigured { .. } | DispatchError::AllCircuitsOpen { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            DispatchError::UpstreamTransportFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Value of the `error` field in the JSON body.
    pub fn label(&self) -> &'static str {
        match self {
            DispatchError::NoRouteFound { .. } => "Bad Gateway",
            DispatchError::NoInstancesConfigured { .. } | DispatchError::AllCircuitsOpen { .. } => {
                "Service Unavailable"
            }
            DispatchError::UpstreamTransportFailure { .. } => "Proxy Error",
        }
    }

    /// Service the request was routed to, if routing got that far.
    pub fn service(&self) -> Option<&str> {
        match self {
            DispatchError::NoRouteFound { .. } => None,
            DispatchError::NoInstancesConfigured { service }
            | DispatchError::AllCircuitsOpen { service }
            | DispatchError::UpstreamTransportFailure { service, .. } => Some(service),
        }
    }

    pub fn to_body(&self, method: &Method, path: &str) -> ErrorBody {
        ErrorBody::new(self.status_code(), self.label(), self.to_string(), method, path)
    }
}
