use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::models::Alert;
use crate::db::services as db_services;
use crate::web::{AppError, AppState};

const DEFAULT_ALERT_LIMIT: i64 = 50;
const MAX_ALERT_LIMIT: i64 = 500;

#[derive(Deserialize)]
pub struct AlertsQuery {
    pub limit: Option<i64>,
}

impl AlertsQuery {
    fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_ALERT_LIMIT)
            .clamp(1, MAX_ALERT_LIMIT)
    }
}

async fn resource_alerts_handler(
    State(app_state): State<Arc<AppState>>,
    Path(resource_id): Path<i32>,
    Query(params): Query<AlertsQuery>,
) -> Result<Json<Vec<Alert>>, AppError> {
    db_services::get_resource_by_id(&app_state.db_pool, resource_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))?;

    let alerts =
        db_services::list_alerts_for_resource(&app_state.db_pool, resource_id, params.limit())
            .await?;
    Ok(Json(alerts))
}

async fn recent_alerts_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<AlertsQuery>,
) -> Result<Json<Vec<Alert>>, AppError> {
    let alerts = db_services::list_recent_alerts(&app_state.db_pool, params.limit()).await?;
    Ok(Json(alerts))
}

pub fn alert_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/v1/resources/{resource_id}/alerts",
            get(resource_alerts_handler),
        )
        .route("/api/v1/alerts", get(recent_alerts_handler))
}
