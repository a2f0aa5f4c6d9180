use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::validation::is_valid_instance_url;
use crate::http::server::AppState;
use crate::load_balancer::{LoadBalancer, ServiceInstance};
use crate::resilience::{BreakerSnapshot, CircuitBreaker};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub namespace: String,
    pub services: usize,
    pub routes: usize,
    pub dispatched_requests: u64,
    pub open_breakers: usize,
}

#[derive(Serialize)]
pub struct ServiceStatus {
    pub name: String,
    /// `None` for services registered at runtime without a descriptor.
    pub timeout_ms: Option<u64>,
    pub health_check_path: Option<String>,
    pub instances: Vec<ServiceInstance>,
}

/// Identifies one instance of one service.
#[derive(Debug, Deserialize)]
pub struct InstanceRef {
    pub service: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct InstanceHealth {
    pub service: String,
    pub url: String,
    pub healthy: bool,
}

fn rejection(status: StatusCode, message: String) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(json!({ "error": message })))
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let gateway = &state.gateway;
    let config = gateway.config.load();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        namespace: config.scope.namespace.clone(),
        services: gateway.balancer.services().len(),
        routes: gateway.router.route_count(),
        dispatched_requests: gateway.dispatcher.dispatched(),
        open_breakers: gateway.breakers.snapshot().iter().filter(|b| b.open).count(),
    })
}

pub async fn get_services(State(state): State<AppState>) -> Json<Vec<ServiceStatus>> {
    let gateway = &state.gateway;
    let registry = gateway.registry.load();

    let statuses = gateway
        .balancer
        .services()
        .into_iter()
        .map(|name| {
            let descriptor = registry.get(&name);
            ServiceStatus {
                timeout_ms: descriptor.map(|d| d.timeout_ms),
                health_check_path: descriptor.map(|d| d.health_check_path.clone()),
                instances: gateway.balancer.instances(&name),
                name,
            }
        })
        .collect();

    Json(statuses)
}

pub async fn get_breakers(State(state): State<AppState>) -> Json<Vec<BreakerSnapshot>> {
    Json(state.gateway.breakers.snapshot())
}

pub async fn reset_breaker(
    State(state): State<AppState>,
    Json(target): Json<InstanceRef>,
) -> impl IntoResponse {
    state.gateway.breakers.reset(&target.service, &target.url);
    Json(json!({ "service": target.service, "url": target.url, "open": false }))
}

pub async fn add_instance(
    State(state): State<AppState>,
    Json(target): Json<InstanceRef>,
) -> impl IntoResponse {
    if target.service.is_empty() || !is_valid_instance_url(&target.url) {
        return rejection(
            StatusCode::BAD_REQUEST,
            format!("invalid instance '{}' for service '{}'", target.url, target.service),
        )
        .into_response();
    }

    let balancer = &state.gateway.balancer;
    balancer.add_instance(&target.service, &target.url);

    (StatusCode::CREATED, Json(balancer.instances(&target.service))).into_response()
}

pub async fn set_instance_health(
    State(state): State<AppState>,
    Json(update): Json<InstanceHealth>,
) -> impl IntoResponse {
    let balancer = &state.gateway.balancer;
    let known = balancer
        .instances(&update.service)
        .iter()
        .any(|i| i.url == update.url);
    if !known {
        return rejection(
            StatusCode::NOT_FOUND,
            format!("unknown instance '{}' for service '{}'", update.url, update.service),
        )
        .into_response();
    }

    if update.healthy {
        balancer.mark_healthy(&update.service, &update.url);
    } else {
        balancer.mark_unhealthy(&update.service, &update.url);
    }

    Json(balancer.instances(&update.service)).into_response()
}
