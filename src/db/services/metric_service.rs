use chrono::{Duration, Utc};
use sqlx::{PgPool, Result};

use crate::alerting::evaluator::AlertDraft;
use crate::db::enums::{AlertStatus, ResourceStatus};
use crate::db::models::{Alert, MetricSample, NewMetricSample, NewProcessSample, ProcessSample};

/// Hard cap on stored process snapshots per ingestion call.
pub const MAX_PROCESSES_PER_INGESTION: usize = 5;

const HISTORY_MIN_HOURS: i64 = 1;
const HISTORY_MAX_HOURS: i64 = 168;
const HISTORY_DEFAULT_HOURS: i64 = 24;

/// Persists one metric ingestion as a single atomic unit: the sample row, up
/// to [`MAX_PROCESSES_PER_INGESTION`] process rows, the resource's current
/// snapshot (which also marks it active and bumps `last_seen`), and any alert
/// drafts from the threshold evaluator.
///
/// The resource row is locked `FOR UPDATE` first, so concurrent ingestions for
/// the same resource serialize at the database.
pub async fn record_ingestion(
    pool: &PgPool,
    resource_id: i32,
    sample: &NewMetricSample,
    processes: &[NewProcessSample],
    alert_drafts: &[AlertDraft],
) -> Result<(MetricSample, Vec<Alert>)> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT id FROM resources WHERE id = $1 FOR UPDATE")
        .bind(resource_id)
        .fetch_one(&mut *tx)
        .await?;

    let stored: MetricSample = sqlx::query_as(
        "INSERT INTO metrics (resource_id, cpu_usage, memory_usage, disk_usage, network_in, network_out, timestamp) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id, resource_id, cpu_usage, memory_usage, disk_usage, network_in, network_out, timestamp",
    )
    .bind(resource_id)
    .bind(sample.cpu_usage)
    .bind(sample.memory_usage)
    .bind(sample.disk_usage)
    .bind(sample.network_in)
    .bind(sample.network_out)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    for process in processes.iter().take(MAX_PROCESSES_PER_INGESTION) {
        sqlx::query(
            "INSERT INTO process_metrics (resource_id, process_name, process_pid, cpu_percent, memory_percent, timestamp) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(resource_id)
        .bind(&process.process_name)
        .bind(process.process_pid)
        .bind(process.cpu_percent)
        .bind(process.memory_percent)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        "UPDATE resources SET cpu_usage = $1, memory_usage = $2, disk_usage = $3, \
         status = $4, last_seen = $5, updated_at = $5 WHERE id = $6",
    )
    .bind(sample.cpu_usage)
    .bind(sample.memory_usage)
    .bind(sample.disk_usage)
    .bind(ResourceStatus::Active.as_str())
    .bind(now)
    .bind(resource_id)
    .execute(&mut *tx)
    .await?;

    let mut alerts = Vec::with_capacity(alert_drafts.len());
    for draft in alert_drafts {
        let alert: Alert = sqlx::query_as(
            "INSERT INTO alerts (resource_id, severity, message, status, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, resource_id, severity, message, status, created_at",
        )
        .bind(resource_id)
        .bind(draft.severity.as_str())
        .bind(&draft.message)
        .bind(AlertStatus::Firing.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;
        alerts.push(alert);
    }

    tx.commit().await?;
    Ok((stored, alerts))
}

/// Returns samples within the last `hours` (clamped to 1–168, default 24),
/// oldest first.
pub async fn get_metrics_history(
    pool: &PgPool,
    resource_id: i32,
    hours: Option<i64>,
) -> Result<Vec<MetricSample>> {
    let hours = hours
        .unwrap_or(HISTORY_DEFAULT_HOURS)
        .clamp(HISTORY_MIN_HOURS, HISTORY_MAX_HOURS);
    let since = Utc::now() - Duration::hours(hours);

    sqlx::query_as(
        "SELECT id, resource_id, cpu_usage, memory_usage, disk_usage, network_in, network_out, timestamp \
         FROM metrics WHERE resource_id = $1 AND timestamp >= $2 ORDER BY timestamp ASC",
    )
    .bind(resource_id)
    .bind(since)
    .fetch_all(pool)
    .await
}

/// Returns the most recent process snapshots reported within the last five
/// minutes, newest first, capped at 10 rows.
pub async fn get_top_processes(pool: &PgPool, resource_id: i32) -> Result<Vec<ProcessSample>> {
    let since = Utc::now() - Duration::minutes(5);

    sqlx::query_as(
        "SELECT id, resource_id, process_name, process_pid, cpu_percent, memory_percent, timestamp \
         FROM process_metrics WHERE resource_id = $1 AND timestamp >= $2 \
         ORDER BY timestamp DESC LIMIT 10",
    )
    .bind(resource_id)
    .bind(since)
    .fetch_all(pool)
    .await
}
