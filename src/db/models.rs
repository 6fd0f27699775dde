use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A managed resource (typically a server reachable over SSH).
/// Corresponds to the `resources` table.
///
/// The two `encrypted_*` columns hold AES-GCM ciphertexts and are never
/// serialized into API responses.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Resource {
    pub id: i32,
    pub name: String,
    pub ip_address: Option<String>,
    pub hostname: Option<String>,
    pub cpu_cores: Option<i32>,
    pub memory_gb: Option<f64>,
    pub disk_gb: Option<f64>,
    pub os_type: Option<String>,
    pub os_version: Option<String>,
    pub status: String, // see db::enums::ResourceStatus
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    #[serde(skip_serializing)]
    pub encrypted_password: Option<String>,
    #[serde(skip_serializing)]
    pub encrypted_private_key: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Column values for inserting a new resource row.
#[derive(Debug, Clone, Default)]
pub struct NewResource {
    pub name: String,
    pub ip_address: Option<String>,
    pub hostname: Option<String>,
    pub cpu_cores: Option<i32>,
    pub memory_gb: Option<f64>,
    pub disk_gb: Option<f64>,
    pub os_type: Option<String>,
    pub os_version: Option<String>,
    pub status: String,
    pub encrypted_password: Option<String>,
    pub encrypted_private_key: Option<String>,
    pub description: Option<String>,
}

/// Editable fields for a partial resource update. `None` leaves the column
/// untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceUpdate {
    pub name: Option<String>,
    pub status: Option<String>,
    pub ip_address: Option<String>,
    pub hostname: Option<String>,
    pub cpu_cores: Option<i32>,
    pub memory_gb: Option<f64>,
    pub disk_gb: Option<f64>,
    pub os_type: Option<String>,
    pub os_version: Option<String>,
    pub description: Option<String>,
}

/// Values of one metric ingestion call, before persistence.
#[derive(Debug, Clone, Copy)]
pub struct NewMetricSample {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub network_in: f64,
    pub network_out: f64,
}

/// One process snapshot reported alongside a metric ingestion.
#[derive(Debug, Clone)]
pub struct NewProcessSample {
    pub process_name: String,
    pub process_pid: i32,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// One metric ingestion row. Corresponds to the `metrics` table; append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MetricSample {
    pub id: i32,
    pub resource_id: i32,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub network_in: f64,
    pub network_out: f64,
    pub timestamp: DateTime<Utc>,
}

/// One process snapshot row. Corresponds to the `process_metrics` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProcessSample {
    pub id: i32,
    pub resource_id: i32,
    pub process_name: String,
    pub process_pid: i32,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub timestamp: DateTime<Utc>,
}

/// An alert record emitted by the threshold evaluator.
/// Corresponds to the `alerts` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Alert {
    pub id: i32,
    pub resource_id: i32,
    pub severity: String, // see db::enums::AlertSeverity
    pub message: String,
    pub status: String, // see db::enums::AlertStatus
    pub created_at: DateTime<Utc>,
}
