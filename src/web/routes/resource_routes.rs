use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

use crate::db::enums::ResourceStatus;
use crate::db::models::{Resource, ResourceUpdate};
use crate::db::services as db_services;
use crate::orchestrator::onboarding::{CreateResourceRequest, DeployOutcome, OnboardingOutcome};
use crate::orchestrator::{DecommissionOutcome, UninstallRequest};
use crate::probe::Credentials;
use crate::web::{AppError, AppState};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Acting principal for token issuance. User authentication is handled by an
/// outer layer; it forwards the identity in a header.
fn principal(headers: &HeaderMap) -> &str {
    headers
        .get("x-principal")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("admin")
}

async fn create_resource_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateResourceRequest>,
) -> Result<(StatusCode, Json<OnboardingOutcome>), AppError> {
    let outcome = app_state
        .onboarding
        .create(payload, principal(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[derive(Deserialize)]
pub struct ListResourcesQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

async fn list_resources_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ListResourcesQuery>,
) -> Result<Json<Vec<Resource>>, AppError> {
    if let Some(status) = params.status.as_deref() {
        ResourceStatus::from_str(status).map_err(AppError::InvalidInput)?;
    }
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0).max(0);

    let resources =
        db_services::list_resources(&app_state.db_pool, params.status.as_deref(), limit, offset)
            .await?;
    Ok(Json(resources))
}

async fn get_resource_handler(
    State(app_state): State<Arc<AppState>>,
    Path(resource_id): Path<i32>,
) -> Result<Json<Resource>, AppError> {
    let resource = db_services::get_resource_by_id(&app_state.db_pool, resource_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))?;
    Ok(Json(resource))
}

async fn update_resource_handler(
    State(app_state): State<Arc<AppState>>,
    Path(resource_id): Path<i32>,
    Json(payload): Json<ResourceUpdate>,
) -> Result<Json<Resource>, AppError> {
    if let Some(status) = payload.status.as_deref() {
        ResourceStatus::from_str(status).map_err(AppError::InvalidInput)?;
    }
    if let Some(name) = payload.name.as_deref() {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "resource name must not be empty".to_string(),
            ));
        }
    }

    let resource = db_services::update_resource(&app_state.db_pool, resource_id, &payload)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::Conflict("Resource name already exists".to_string());
                }
            }
            AppError::from(e)
        })?
        .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))?;
    Ok(Json(resource))
}

async fn delete_resource_handler(
    State(app_state): State<Arc<AppState>>,
    Path(resource_id): Path<i32>,
    payload: Option<Json<UninstallRequest>>,
) -> Result<Json<DecommissionOutcome>, AppError> {
    // Snapshot the row first so published gauge readings can be cleared once
    // the record is gone.
    let resource = db_services::get_resource_by_id(&app_state.db_pool, resource_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))?;

    let outcome = app_state
        .decommission
        .decommission(resource_id, payload.map(|Json(request)| request))
        .await?;

    app_state.registry.clear_resource(&resource);
    Ok(Json(outcome))
}

#[derive(Deserialize)]
pub struct DeployAgentRequest {
    pub credentials: Credentials,
    pub callback_url: Option<String>,
}

async fn deploy_agent_handler(
    State(app_state): State<Arc<AppState>>,
    Path(resource_id): Path<i32>,
    headers: HeaderMap,
    Json(payload): Json<DeployAgentRequest>,
) -> Result<Json<DeployOutcome>, AppError> {
    let outcome = app_state
        .onboarding
        .deploy_agent(
            resource_id,
            payload.credentials,
            payload.callback_url,
            principal(&headers),
        )
        .await?;
    Ok(Json(outcome))
}

pub fn resource_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/v1/resources",
            post(create_resource_handler).get(list_resources_handler),
        )
        .route(
            "/api/v1/resources/{resource_id}",
            get(get_resource_handler)
                .put(update_resource_handler)
                .delete(delete_resource_handler),
        )
        .route(
            "/api/v1/resources/{resource_id}/agent/deploy",
            post(deploy_agent_handler),
        )
}
