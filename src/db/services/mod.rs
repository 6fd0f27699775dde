//! High-level database access. All SQL lives here, as free async functions
//! over a `PgPool`, so handlers and orchestrators work with domain models
//! without knowing the schema.

pub mod alert_service;
pub mod metric_service;
pub mod resource_service;

pub use alert_service::*;
pub use metric_service::*;
pub use resource_service::*;
