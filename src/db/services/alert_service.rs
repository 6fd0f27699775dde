use sqlx::{PgPool, Result};

use crate::db::models::Alert;

const ALERT_COLUMNS: &str = "id, resource_id, severity, message, status, created_at";

/// Alerts for one resource, newest first.
pub async fn list_alerts_for_resource(
    pool: &PgPool,
    resource_id: i32,
    limit: i64,
) -> Result<Vec<Alert>> {
    let sql = format!(
        "SELECT {ALERT_COLUMNS} FROM alerts WHERE resource_id = $1 \
         ORDER BY created_at DESC LIMIT $2"
    );
    sqlx::query_as::<_, Alert>(&sql)
        .bind(resource_id)
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// Most recent alerts across all resources.
pub async fn list_recent_alerts(pool: &PgPool, limit: i64) -> Result<Vec<Alert>> {
    let sql = format!("SELECT {ALERT_COLUMNS} FROM alerts ORDER BY created_at DESC LIMIT $1");
    sqlx::query_as::<_, Alert>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await
}
