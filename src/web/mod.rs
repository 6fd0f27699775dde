use axum::{
    extract::State,
    http::Method,
    routing::get,
    Router,
};
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::monitoring::MetricsRegistry;
use crate::orchestrator::{DecommissionOrchestrator, OnboardingOrchestrator};
use crate::services::token_service::TokenIssuer;

pub mod error;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub tokens: TokenIssuer,
    pub registry: MetricsRegistry,
    pub onboarding: Arc<OnboardingOrchestrator>,
    pub decommission: Arc<DecommissionOrchestrator>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

async fn prometheus_handler(State(app_state): State<Arc<AppState>>) -> String {
    app_state.registry.render()
}

pub fn build_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .route("/metrics", get(prometheus_handler))
        .merge(routes::resource_routes::resource_router())
        .merge(routes::metrics_routes::metrics_router())
        .merge(routes::alert_routes::alert_router())
        .with_state(app_state)
        .layer(cors)
}

pub async fn run_http_server(
    app_state: Arc<AppState>,
    http_addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app_router = build_router(app_state);

    info!("HTTP server listening on {http_addr}");
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    axum::serve(listener, app_router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("received Ctrl+C, shutting down");
    }
}
