//! Admin API: runtime inspection and operator overrides.
//!
//! Served on its own listener, every route behind the bearer-token check.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/services", get(get_services))
        .route("/admin/breakers", get(get_breakers))
        .route("/admin/breakers/reset", post(reset_breaker))
        .route("/admin/instances", post(add_instance))
        .route("/admin/instances/health", post(set_instance_health))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
