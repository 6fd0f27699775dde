use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::alerting::evaluator;
use crate::db::models::{Alert, MetricSample, NewMetricSample, NewProcessSample, ProcessSample};
use crate::db::services as db_services;
use crate::web::{AppError, AppState};

/// Extracts and verifies the agent's bearer token, returning the resource id
/// baked into its claims.
fn authenticate_agent(app_state: &AppState, headers: &HeaderMap) -> Result<i32, AppError> {
    let token = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = app_state
        .tokens
        .verify_agent_token(token)
        .map_err(|_| AppError::Unauthorized("Invalid agent token".to_string()))?;
    Ok(claims.resource_id)
}

fn validate_percentage(name: &str, value: f64) -> Result<(), AppError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(AppError::InvalidInput(format!(
            "{name} must be between 0 and 100, got {value}"
        )));
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct ProcessReport {
    pub process_name: String,
    pub process_pid: i32,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

#[derive(Deserialize)]
pub struct IngestMetricsRequest {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    #[serde(default)]
    pub network_in: f64,
    #[serde(default)]
    pub network_out: f64,
    #[serde(default)]
    pub processes: Vec<ProcessReport>,
}

#[derive(Serialize)]
pub struct IngestMetricsResponse {
    pub metric: MetricSample,
    pub alerts: Vec<Alert>,
}

async fn ingest_metrics_handler(
    State(app_state): State<Arc<AppState>>,
    Path(resource_id): Path<i32>,
    headers: HeaderMap,
    Json(payload): Json<IngestMetricsRequest>,
) -> Result<Json<IngestMetricsResponse>, AppError> {
    let token_resource_id = authenticate_agent(&app_state, &headers)?;
    if token_resource_id != resource_id {
        return Err(AppError::Unauthorized(
            "Token is not valid for this resource".to_string(),
        ));
    }

    validate_percentage("cpu_usage", payload.cpu_usage)?;
    validate_percentage("memory_usage", payload.memory_usage)?;
    validate_percentage("disk_usage", payload.disk_usage)?;

    let resource = db_services::get_resource_by_id(&app_state.db_pool, resource_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))?;

    let sample = NewMetricSample {
        cpu_usage: payload.cpu_usage,
        memory_usage: payload.memory_usage,
        disk_usage: payload.disk_usage,
        network_in: payload.network_in,
        network_out: payload.network_out,
    };
    let processes: Vec<NewProcessSample> = payload
        .processes
        .into_iter()
        .map(|p| NewProcessSample {
            process_name: p.process_name,
            process_pid: p.process_pid,
            cpu_percent: p.cpu_percent,
            memory_percent: p.memory_percent,
        })
        .collect();

    let drafts = evaluator::evaluate(&sample);
    let (metric, alerts) =
        db_services::record_ingestion(&app_state.db_pool, resource_id, &sample, &processes, &drafts)
            .await?;

    app_state.registry.publish(&resource, &sample);

    if !alerts.is_empty() {
        info!(
            resource_id,
            count = alerts.len(),
            "threshold alerts raised during ingestion"
        );
    }
    Ok(Json(IngestMetricsResponse { metric, alerts }))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub hours: Option<i64>,
}

async fn metrics_history_handler(
    State(app_state): State<Arc<AppState>>,
    Path(resource_id): Path<i32>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<MetricSample>>, AppError> {
    db_services::get_resource_by_id(&app_state.db_pool, resource_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))?;

    let history =
        db_services::get_metrics_history(&app_state.db_pool, resource_id, params.hours).await?;
    Ok(Json(history))
}

async fn top_processes_handler(
    State(app_state): State<Arc<AppState>>,
    Path(resource_id): Path<i32>,
) -> Result<Json<Vec<ProcessSample>>, AppError> {
    db_services::get_resource_by_id(&app_state.db_pool, resource_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))?;

    let processes = db_services::get_top_processes(&app_state.db_pool, resource_id).await?;
    Ok(Json(processes))
}

pub fn metrics_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/v1/resources/{resource_id}/metrics",
            post(ingest_metrics_handler),
        )
        .route(
            "/api/v1/resources/{resource_id}/metrics/history",
            get(metrics_history_handler),
        )
        .route(
            "/api/v1/resources/{resource_id}/processes/top",
            get(top_processes_handler),
        )
}
