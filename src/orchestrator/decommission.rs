//! Decommissioning: best-effort remote cleanup, then unconditional record
//! removal. The record is gone either way; uninstallation is never a
//! precondition for deletion.

use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::agent::AgentLifecycle;
use crate::probe::Credentials;

use super::store::ResourceStore;

#[derive(Debug, Clone, Deserialize)]
pub struct UninstallRequest {
    #[serde(default)]
    pub uninstall_agent: bool,
    /// Fresh credentials for the cleanup session; may differ from what was
    /// stored at onboarding time.
    pub credentials: Option<Credentials>,
}

#[derive(Debug, PartialEq, Eq, serde::Serialize)]
pub struct DecommissionOutcome {
    pub agent_uninstalled: bool,
    pub warning: Option<String>,
}

#[derive(Debug, Error)]
pub enum DecommissionError {
    #[error("resource not found")]
    NotFound,
    #[error("database error: {0}")]
    Store(String),
}

pub struct DecommissionOrchestrator {
    store: Arc<dyn ResourceStore>,
    agent: Arc<dyn AgentLifecycle>,
}

impl DecommissionOrchestrator {
    pub fn new(store: Arc<dyn ResourceStore>, agent: Arc<dyn AgentLifecycle>) -> Self {
        DecommissionOrchestrator { store, agent }
    }

    pub async fn decommission(
        &self,
        resource_id: i32,
        request: Option<UninstallRequest>,
    ) -> Result<DecommissionOutcome, DecommissionError> {
        let resource = self
            .store
            .find_by_id(resource_id)
            .await
            .map_err(|e| DecommissionError::Store(e.to_string()))?
            .ok_or(DecommissionError::NotFound)?;

        let mut agent_uninstalled = false;
        let mut warning = None;

        if let Some(request) = request.filter(|r| r.uninstall_agent) {
            match (resource.ip_address.clone(), request.credentials) {
                (Some(ip_address), Some(mut credentials)) => {
                    if credentials.host.trim().is_empty() {
                        credentials.host = ip_address;
                    }
                    match credentials.validate() {
                        Ok(()) => match self.agent.uninstall_agent(&credentials).await {
                            Ok(()) => {
                                info!(resource_id, "agent uninstalled");
                                agent_uninstalled = true;
                            }
                            Err(e) => {
                                warn!(resource_id, error = %e, "agent uninstall failed");
                                warning = Some(format!("agent uninstall failed: {e}"));
                            }
                        },
                        Err(e) => {
                            warning = Some(format!("agent uninstall skipped: {e}"));
                        }
                    }
                }
                (None, _) => {
                    warning = Some(
                        "agent uninstall skipped: resource has no IP address".to_string(),
                    );
                }
                (_, None) => {
                    warning = Some(
                        "agent uninstall skipped: no credentials supplied".to_string(),
                    );
                }
            }
        }

        // Deletion is unconditional; the uninstall outcome never blocks it.
        self.store
            .delete(resource_id)
            .await
            .map_err(|e| DecommissionError::Store(e.to_string()))?;
        info!(resource_id, name = %resource.name, "resource deleted");

        Ok(DecommissionOutcome {
            agent_uninstalled,
            warning,
        })
    }
}
