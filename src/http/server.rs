//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway's local handlers
//! - Put the dispatch middleware in front of every route and the fallback
//! - Wire up middleware (tracing, timeout, request ID)
//! - Spawn the admin API, health monitor and config reload loop
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Method, Request, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::GatewayConfig;
use crate::dispatch::DispatchOutcome;
use crate::health::HealthMonitor;
use crate::http::request::{GatewayRequestId, X_REQUEST_ID};
use crate::http::response::ErrorBody;
use crate::lifecycle::{Gateway, ShutdownSignal, StartupError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub started_at: Instant,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        Ok(Self::from_gateway(Gateway::build(config)?))
    }

    /// Serve an already assembled gateway.
    pub fn from_gateway(gateway: Gateway) -> Self {
        let state = AppState {
            gateway: Arc::new(gateway),
            started_at: Instant::now(),
        };
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let request_secs = state.gateway.config.load().timeouts.request_secs;
        let x_request_id = HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .route("/health", get(health_handler))
            .fallback(not_found_handler)
            .layer(middleware::from_fn_with_state(state.clone(), dispatch_middleware))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(x_request_id.clone(), GatewayRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(x_request_id))
                    .layer(TimeoutLayer::new(Duration::from_secs(request_secs))),
            )
    }

    /// Shared gateway state.
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.state.gateway
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configuration snapshots received on `config_updates` are applied as
    /// they arrive. Returns once `shutdown` fires and in-flight requests drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let config = self.state.gateway.config.load_full();

        tracing::info!(
            address = %addr,
            namespace = %config.scope.namespace,
            "HTTP server starting"
        );

        if config.health_check.enabled {
            let monitor = HealthMonitor::new(
                self.state.gateway.balancer.clone(),
                self.state.gateway.registry.clone(),
                config.health_check.clone(),
            );
            let monitor_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                monitor.run(monitor_shutdown).await;
            });
        }

        if config.admin.enabled {
            let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
            tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");

            let admin = setup_admin_router(self.state.clone());
            let mut admin_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                let served = axum::serve(admin_listener, admin)
                    .with_graceful_shutdown(async move { admin_shutdown.recv().await })
                    .await;
                if let Err(e) = served {
                    tracing::error!(error = %e, "Admin API stopped with error");
                }
            });
        }

        let gateway = self.state.gateway.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => {
                        let Some(new_config) = update else { break };
                        if let Err(e) = gateway.apply_reload(new_config) {
                            tracing::error!(error = %e, "Rejected configuration reload");
                        }
                    }
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Sends namespace traffic to the dispatcher; everything else continues to local routes.
async fn dispatch_middleware(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    match state.gateway.dispatcher.dispatch(request).await {
        DispatchOutcome::Handled(response) => response,
        DispatchOutcome::PassThrough(request) => next.run(request).await,
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSecs": state.started_at.elapsed().as_secs(),
        "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    }))
}

async fn not_found_handler(method: Method, uri: Uri) -> impl IntoResponse {
    ErrorBody::not_found(&method, uri.path())
}
