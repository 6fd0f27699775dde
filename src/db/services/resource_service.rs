use chrono::Utc;
use sqlx::{PgPool, Result};

use crate::db::models::{NewResource, Resource, ResourceUpdate};

const RESOURCE_COLUMNS: &str = "id, name, ip_address, hostname, cpu_cores, memory_gb, disk_gb, \
     os_type, os_version, status, cpu_usage, memory_usage, disk_usage, \
     encrypted_password, encrypted_private_key, description, created_at, updated_at, last_seen";

/// Inserts a new resource row. A unique-constraint violation on `name`
/// surfaces as the underlying `sqlx::Error`; callers map it to a
/// duplicate-name error.
pub async fn create_resource(pool: &PgPool, new: &NewResource) -> Result<Resource> {
    let now = Utc::now();
    let sql = format!(
        "INSERT INTO resources (name, ip_address, hostname, cpu_cores, memory_gb, disk_gb, \
         os_type, os_version, status, encrypted_password, encrypted_private_key, description, \
         created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13) \
         RETURNING {RESOURCE_COLUMNS}"
    );
    sqlx::query_as::<_, Resource>(&sql)
        .bind(&new.name)
        .bind(&new.ip_address)
        .bind(&new.hostname)
        .bind(new.cpu_cores)
        .bind(new.memory_gb)
        .bind(new.disk_gb)
        .bind(&new.os_type)
        .bind(&new.os_version)
        .bind(&new.status)
        .bind(&new.encrypted_password)
        .bind(&new.encrypted_private_key)
        .bind(&new.description)
        .bind(now)
        .fetch_one(pool)
        .await
}

pub async fn get_resource_by_id(pool: &PgPool, resource_id: i32) -> Result<Option<Resource>> {
    let sql = format!("SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = $1");
    sqlx::query_as::<_, Resource>(&sql)
        .bind(resource_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_resource_by_name(pool: &PgPool, name: &str) -> Result<Option<Resource>> {
    let sql = format!("SELECT {RESOURCE_COLUMNS} FROM resources WHERE name = $1");
    sqlx::query_as::<_, Resource>(&sql)
        .bind(name)
        .fetch_optional(pool)
        .await
}

/// Lists resources, newest first, with optional status filter.
pub async fn list_resources(
    pool: &PgPool,
    status: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Resource>> {
    match status {
        Some(status) => {
            let sql = format!(
                "SELECT {RESOURCE_COLUMNS} FROM resources WHERE status = $1 \
                 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
            );
            sqlx::query_as::<_, Resource>(&sql)
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await
        }
        None => {
            let sql = format!(
                "SELECT {RESOURCE_COLUMNS} FROM resources \
                 ORDER BY created_at DESC LIMIT $1 OFFSET $2"
            );
            sqlx::query_as::<_, Resource>(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await
        }
    }
}

/// Applies a partial update to the editable resource fields.
/// Returns the updated row, or `None` when the resource does not exist.
pub async fn update_resource(
    pool: &PgPool,
    resource_id: i32,
    update: &ResourceUpdate,
) -> Result<Option<Resource>> {
    let now = Utc::now();
    let sql = format!(
        "UPDATE resources SET \
            name = COALESCE($1, name), \
            status = COALESCE($2, status), \
            ip_address = COALESCE($3, ip_address), \
            hostname = COALESCE($4, hostname), \
            cpu_cores = COALESCE($5, cpu_cores), \
            memory_gb = COALESCE($6, memory_gb), \
            disk_gb = COALESCE($7, disk_gb), \
            os_type = COALESCE($8, os_type), \
            os_version = COALESCE($9, os_version), \
            description = COALESCE($10, description), \
            updated_at = $11 \
         WHERE id = $12 \
         RETURNING {RESOURCE_COLUMNS}"
    );
    sqlx::query_as::<_, Resource>(&sql)
        .bind(&update.name)
        .bind(&update.status)
        .bind(&update.ip_address)
        .bind(&update.hostname)
        .bind(update.cpu_cores)
        .bind(update.memory_gb)
        .bind(update.disk_gb)
        .bind(&update.os_type)
        .bind(&update.os_version)
        .bind(&update.description)
        .bind(now)
        .bind(resource_id)
        .fetch_optional(pool)
        .await
}

/// Deletes a resource. Metric, process and alert history go with it via the
/// `ON DELETE CASCADE` foreign keys. Returns whether a row was removed.
pub async fn delete_resource(pool: &PgPool, resource_id: i32) -> Result<bool> {
    let rows = sqlx::query("DELETE FROM resources WHERE id = $1")
        .bind(resource_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows > 0)
}
