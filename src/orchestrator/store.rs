//! Persistence seam for the orchestrators: the narrow query interface they
//! need, so partial-failure policy is testable without a database.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;

use crate::db::models::{NewResource, Resource};
use crate::db::services::resource_service;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("resource name already exists")]
    DuplicateName,
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::DuplicateName;
            }
        }
        StoreError::Database(err.to_string())
    }
}

#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<Resource>, StoreError>;
    async fn find_by_id(&self, resource_id: i32) -> Result<Option<Resource>, StoreError>;
    /// Inserts a new row; a lost name-uniqueness race maps to
    /// [`StoreError::DuplicateName`].
    async fn insert(&self, new: NewResource) -> Result<Resource, StoreError>;
    /// Removes the row (history cascades). Returns whether a row existed.
    async fn delete(&self, resource_id: i32) -> Result<bool, StoreError>;
}

pub struct PgResourceStore {
    pool: Arc<PgPool>,
}

impl PgResourceStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        PgResourceStore { pool }
    }
}

#[async_trait]
impl ResourceStore for PgResourceStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Resource>, StoreError> {
        Ok(resource_service::get_resource_by_name(&self.pool, name).await?)
    }

    async fn find_by_id(&self, resource_id: i32) -> Result<Option<Resource>, StoreError> {
        Ok(resource_service::get_resource_by_id(&self.pool, resource_id).await?)
    }

    async fn insert(&self, new: NewResource) -> Result<Resource, StoreError> {
        Ok(resource_service::create_resource(&self.pool, &new).await?)
    }

    async fn delete(&self, resource_id: i32) -> Result<bool, StoreError> {
        Ok(resource_service::delete_resource(&self.pool, resource_id).await?)
    }
}
