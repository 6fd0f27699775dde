//! Onboarding: probe, persist, issue a token, deploy the agent.
//!
//! Failure policy: anything before the insert aborts the whole operation and
//! leaves no persistent state; anything after the insert is a soft failure
//! reported as a warning next to the committed record.

use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::agent::AgentLifecycle;
use crate::db::enums::ResourceStatus;
use crate::db::models::{NewResource, Resource};
use crate::probe::{Credentials, HostFingerprint, ProbeError, Prober};
use crate::services::encryption_service::{CipherError, CredentialCipher};
use crate::services::token_service::TokenIssuer;

use super::store::{ResourceStore, StoreError};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateResourceRequest {
    pub name: String,
    pub ip_address: Option<String>,
    pub hostname: Option<String>,
    pub cpu_cores: Option<i32>,
    pub memory_gb: Option<f64>,
    pub disk_gb: Option<f64>,
    pub os_type: Option<String>,
    pub os_version: Option<String>,
    pub status: Option<ResourceStatus>,
    pub description: Option<String>,
    /// When present (together with `ip_address`), the create becomes an
    /// auto-discovery create: probe first, then persist, then deploy.
    pub credentials: Option<Credentials>,
    /// Base URL the deployed agent posts metrics back to; the server default
    /// applies when unset.
    pub callback_url: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct OnboardingOutcome {
    pub resource: Resource,
    pub fingerprint: Option<HostFingerprint>,
    pub agent_deployed: bool,
    pub warning: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct DeployOutcome {
    pub agent_deployed: bool,
    pub warning: Option<String>,
}

#[derive(Debug, Error)]
pub enum OnboardingError {
    #[error("resource name already exists: {0}")]
    DuplicateName(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid request: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error("database error: {0}")]
    Store(String),
}

pub struct OnboardingOrchestrator {
    store: Arc<dyn ResourceStore>,
    prober: Arc<dyn Prober>,
    agent: Arc<dyn AgentLifecycle>,
    tokens: TokenIssuer,
    cipher: CredentialCipher,
    default_callback_url: String,
}

impl OnboardingOrchestrator {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        prober: Arc<dyn Prober>,
        agent: Arc<dyn AgentLifecycle>,
        tokens: TokenIssuer,
        cipher: CredentialCipher,
        default_callback_url: String,
    ) -> Self {
        OnboardingOrchestrator {
            store,
            prober,
            agent,
            tokens,
            cipher,
            default_callback_url,
        }
    }

    /// Creates a resource. With credentials this is the auto-discovery path;
    /// without, the record is persisted directly from client-supplied fields.
    pub async fn create(
        &self,
        request: CreateResourceRequest,
        principal: &str,
    ) -> Result<OnboardingOutcome, OnboardingError> {
        if request.name.trim().is_empty() {
            return Err(OnboardingError::InvalidInput(
                "resource name must not be empty".to_string(),
            ));
        }

        // Duplicate names are rejected before any remote call is made.
        if self
            .store
            .find_by_name(&request.name)
            .await
            .map_err(store_error)?
            .is_some()
        {
            return Err(OnboardingError::DuplicateName(request.name));
        }

        match request.credentials.clone() {
            Some(credentials) => self.auto_discovery_create(request, credentials, principal).await,
            None => self.unmanaged_create(request).await,
        }
    }

    async fn unmanaged_create(
        &self,
        request: CreateResourceRequest,
    ) -> Result<OnboardingOutcome, OnboardingError> {
        let status = request.status.unwrap_or(ResourceStatus::Inactive);
        let new = NewResource {
            name: request.name.clone(),
            ip_address: request.ip_address,
            hostname: request.hostname,
            cpu_cores: request.cpu_cores,
            memory_gb: request.memory_gb,
            disk_gb: request.disk_gb,
            os_type: request.os_type,
            os_version: request.os_version,
            status: status.as_str().to_string(),
            encrypted_password: None,
            encrypted_private_key: None,
            description: request.description,
        };

        let resource = self.insert_checked(new).await?;
        info!(resource_id = resource.id, name = %resource.name, "created unmanaged resource");
        Ok(OnboardingOutcome {
            resource,
            fingerprint: None,
            agent_deployed: false,
            warning: None,
        })
    }

    async fn auto_discovery_create(
        &self,
        request: CreateResourceRequest,
        mut credentials: Credentials,
        principal: &str,
    ) -> Result<OnboardingOutcome, OnboardingError> {
        let ip_address = request.ip_address.clone().ok_or_else(|| {
            OnboardingError::InvalidInput(
                "ip_address is required when credentials are supplied".to_string(),
            )
        })?;
        if credentials.host.trim().is_empty() {
            credentials.host = ip_address.clone();
        }
        credentials.validate().map_err(OnboardingError::InvalidInput)?;

        // A failed probe aborts the entire create: it most likely means wrong
        // credentials, and a half-configured record would be misleading.
        let fingerprint = self.prober.probe(&credentials).await?;
        info!(
            name = %request.name,
            hostname = %fingerprint.hostname,
            cpu_cores = fingerprint.cpu_cores,
            "probe succeeded"
        );

        // Client-supplied fields win; the fingerprint only fills gaps.
        let new = NewResource {
            name: request.name.clone(),
            ip_address: Some(ip_address),
            hostname: request.hostname.or(Some(fingerprint.hostname.clone())),
            cpu_cores: request.cpu_cores.or(Some(fingerprint.cpu_cores)),
            memory_gb: request.memory_gb.or(Some(fingerprint.memory_gb)),
            disk_gb: request.disk_gb.or(Some(fingerprint.disk_gb)),
            os_type: request.os_type.or(Some(fingerprint.os_type.clone())),
            os_version: request.os_version.or(Some(fingerprint.os_version.clone())),
            status: ResourceStatus::Active.as_str().to_string(),
            encrypted_password: match credentials.password.as_deref() {
                Some(password) => self.cipher.encrypt(password)?,
                None => None,
            },
            encrypted_private_key: match credentials.private_key.as_deref() {
                Some(key) => self.cipher.encrypt(key)?,
                None => None,
            },
            description: request.description,
        };

        let resource = self.insert_checked(new).await?;
        info!(resource_id = resource.id, name = %resource.name, "created resource via auto-discovery");

        // From here on the record is committed; token issuance and agent
        // deployment can only degrade the outcome, never roll it back.
        let callback_url = request
            .callback_url
            .unwrap_or_else(|| self.default_callback_url.clone());
        let (agent_deployed, warning) = self
            .try_deploy(&credentials, resource.id, principal, &callback_url)
            .await;

        Ok(OnboardingOutcome {
            resource,
            fingerprint: Some(fingerprint),
            agent_deployed,
            warning,
        })
    }

    /// Re-runs the deployment step for an existing resource, e.g. after a
    /// soft-failed create.
    pub async fn deploy_agent(
        &self,
        resource_id: i32,
        mut credentials: Credentials,
        callback_url: Option<String>,
        principal: &str,
    ) -> Result<DeployOutcome, OnboardingError> {
        let resource = self
            .store
            .find_by_id(resource_id)
            .await
            .map_err(store_error)?
            .ok_or(OnboardingError::NotFound)?;

        if credentials.host.trim().is_empty() {
            if let Some(ip) = resource.ip_address.clone() {
                credentials.host = ip;
            }
        }
        credentials.validate().map_err(OnboardingError::InvalidInput)?;

        let callback_url = callback_url.unwrap_or_else(|| self.default_callback_url.clone());
        let (agent_deployed, warning) = self
            .try_deploy(&credentials, resource.id, principal, &callback_url)
            .await;
        Ok(DeployOutcome {
            agent_deployed,
            warning,
        })
    }

    async fn try_deploy(
        &self,
        credentials: &Credentials,
        resource_id: i32,
        principal: &str,
        callback_url: &str,
    ) -> (bool, Option<String>) {
        let token = match self.tokens.issue_agent_token(principal, resource_id) {
            Ok(token) => token,
            Err(e) => {
                warn!(resource_id, error = %e, "agent token issuance failed");
                return (
                    false,
                    Some(format!("agent not deployed: token issuance failed: {e}")),
                );
            }
        };

        match self
            .agent
            .deploy_agent(credentials, resource_id, &token, callback_url)
            .await
        {
            Ok(()) => {
                info!(resource_id, "agent deployed");
                (true, None)
            }
            Err(e) => {
                warn!(resource_id, error = %e, "agent deployment failed");
                (false, Some(format!("agent deployment failed: {e}")))
            }
        }
    }

    async fn insert_checked(&self, new: NewResource) -> Result<Resource, OnboardingError> {
        let name = new.name.clone();
        self.store.insert(new).await.map_err(|e| match e {
            // Lost the uniqueness race after the pre-check.
            StoreError::DuplicateName => OnboardingError::DuplicateName(name),
            StoreError::Database(msg) => OnboardingError::Store(msg),
        })
    }
}

fn store_error(err: StoreError) -> OnboardingError {
    OnboardingError::Store(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentError;
    use crate::orchestrator::testing::{FailingAgent, MemoryStore, OkAgent, ScriptedProber};

    fn orchestrator(
        store: Arc<MemoryStore>,
        prober: Arc<ScriptedProber>,
        agent: Arc<dyn AgentLifecycle>,
    ) -> OnboardingOrchestrator {
        OnboardingOrchestrator::new(
            store,
            prober,
            agent,
            TokenIssuer::new("test-jwt-secret"),
            CredentialCipher::new("test-secret").unwrap(),
            "http://ops.example:8000".to_string(),
        )
    }

    fn discovery_request(name: &str) -> CreateResourceRequest {
        CreateResourceRequest {
            name: name.to_string(),
            ip_address: Some("10.0.0.5".to_string()),
            hostname: None,
            cpu_cores: None,
            memory_gb: None,
            disk_gb: None,
            os_type: None,
            os_version: None,
            status: None,
            description: None,
            credentials: Some(Credentials {
                host: String::new(),
                port: 22,
                username: "root".to_string(),
                password: Some("pw".to_string()),
                private_key: None,
            }),
            callback_url: None,
        }
    }

    #[tokio::test]
    async fn test_failed_probe_persists_nothing() {
        let store = Arc::new(MemoryStore::new());
        let prober = Arc::new(ScriptedProber::failing("auth denied"));
        let orchestrator = orchestrator(store.clone(), prober, Arc::new(OkAgent::new()));

        let result = orchestrator
            .create(discovery_request("web-01"), "admin")
            .await;

        assert!(matches!(result, Err(OnboardingError::Probe(_))));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_deploy_failure_is_soft() {
        let store = Arc::new(MemoryStore::new());
        let prober = Arc::new(ScriptedProber::succeeding());
        let orchestrator = orchestrator(
            store.clone(),
            prober,
            Arc::new(FailingAgent::new("install script exited 1")),
        );

        let outcome = orchestrator
            .create(discovery_request("web-01"), "admin")
            .await
            .unwrap();

        assert!(!outcome.agent_deployed);
        assert!(outcome.warning.as_deref().unwrap().contains("deployment failed"));
        assert_eq!(outcome.resource.status, "active");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_successful_discovery_create() {
        let store = Arc::new(MemoryStore::new());
        let prober = Arc::new(ScriptedProber::succeeding());
        let agent = Arc::new(OkAgent::new());
        let orchestrator = orchestrator(store.clone(), prober, agent.clone());

        let outcome = orchestrator
            .create(discovery_request("web-01"), "admin")
            .await
            .unwrap();

        assert!(outcome.agent_deployed);
        assert!(outcome.warning.is_none());
        let fingerprint = outcome.fingerprint.unwrap();
        assert_eq!(outcome.resource.hostname.as_deref(), Some(fingerprint.hostname.as_str()));
        assert_eq!(outcome.resource.cpu_cores, Some(fingerprint.cpu_cores));
        // Credentials were persisted encrypted, not in plaintext.
        let stored = store.get(outcome.resource.id).unwrap();
        let encrypted = stored.encrypted_password.unwrap();
        assert_ne!(encrypted, "pw");
        assert_eq!(agent.deploy_calls(), 1);
    }

    #[tokio::test]
    async fn test_client_fields_win_over_fingerprint() {
        let store = Arc::new(MemoryStore::new());
        let prober = Arc::new(ScriptedProber::succeeding());
        let orchestrator = orchestrator(store, prober, Arc::new(OkAgent::new()));

        let mut request = discovery_request("web-01");
        request.cpu_cores = Some(64);
        request.os_type = Some("Custom Linux".to_string());

        let outcome = orchestrator.create(request, "admin").await.unwrap();
        assert_eq!(outcome.resource.cpu_cores, Some(64));
        assert_eq!(outcome.resource.os_type.as_deref(), Some("Custom Linux"));
        // Unset fields still come from the fingerprint.
        assert!(outcome.resource.memory_gb.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected_before_probe() {
        let store = Arc::new(MemoryStore::new());
        store.seed("web-01");
        let prober = Arc::new(ScriptedProber::succeeding());
        let orchestrator = orchestrator(store.clone(), prober.clone(), Arc::new(OkAgent::new()));

        let result = orchestrator
            .create(discovery_request("web-01"), "admin")
            .await;

        assert!(matches!(result, Err(OnboardingError::DuplicateName(_))));
        // No remote side effects were observed.
        assert_eq!(prober.probe_calls(), 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_unmanaged_create_keeps_client_status() {
        let store = Arc::new(MemoryStore::new());
        let prober = Arc::new(ScriptedProber::failing("must not be called"));
        let orchestrator = orchestrator(store.clone(), prober.clone(), Arc::new(OkAgent::new()));

        let request = CreateResourceRequest {
            name: "manual-01".to_string(),
            ip_address: None,
            hostname: Some("manual".to_string()),
            cpu_cores: Some(2),
            memory_gb: None,
            disk_gb: None,
            os_type: None,
            os_version: None,
            status: Some(ResourceStatus::Active),
            description: None,
            credentials: None,
            callback_url: None,
        };

        let outcome = orchestrator.create(request, "admin").await.unwrap();
        assert_eq!(outcome.resource.status, "active");
        assert!(!outcome.agent_deployed);
        assert_eq!(prober.probe_calls(), 0);
    }

    #[tokio::test]
    async fn test_credentials_without_ip_rejected() {
        let store = Arc::new(MemoryStore::new());
        let prober = Arc::new(ScriptedProber::succeeding());
        let orchestrator = orchestrator(store.clone(), prober, Arc::new(OkAgent::new()));

        let mut request = discovery_request("web-01");
        request.ip_address = None;

        let result = orchestrator.create(request, "admin").await;
        assert!(matches!(result, Err(OnboardingError::InvalidInput(_))));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_redeploy_for_existing_resource() {
        let store = Arc::new(MemoryStore::new());
        let resource_id = store.seed("web-01");
        let prober = Arc::new(ScriptedProber::succeeding());
        let agent = Arc::new(OkAgent::new());
        let orchestrator = orchestrator(store, prober, agent.clone());

        let outcome = orchestrator
            .deploy_agent(
                resource_id,
                Credentials {
                    host: String::new(),
                    port: 22,
                    username: "root".to_string(),
                    password: Some("pw".to_string()),
                    private_key: None,
                },
                None,
                "admin",
            )
            .await
            .unwrap();

        assert!(outcome.agent_deployed);
        assert_eq!(agent.deploy_calls(), 1);
    }

    #[tokio::test]
    async fn test_redeploy_unknown_resource() {
        let store = Arc::new(MemoryStore::new());
        let orchestrator = orchestrator(
            store,
            Arc::new(ScriptedProber::succeeding()),
            Arc::new(OkAgent::new()),
        );

        let result = orchestrator
            .deploy_agent(
                999,
                Credentials {
                    host: "10.0.0.9".to_string(),
                    port: 22,
                    username: "root".to_string(),
                    password: Some("pw".to_string()),
                    private_key: None,
                },
                None,
                "admin",
            )
            .await;
        assert!(matches!(result, Err(OnboardingError::NotFound)));
    }

    #[tokio::test]
    async fn test_insert_race_surfaces_as_duplicate_name() {
        let store = Arc::new(MemoryStore::new());
        store.fail_next_insert_with(StoreError::DuplicateName);
        let orchestrator = orchestrator(
            store,
            Arc::new(ScriptedProber::succeeding()),
            Arc::new(OkAgent::new()),
        );

        let result = orchestrator
            .create(discovery_request("web-01"), "admin")
            .await;
        assert!(matches!(result, Err(OnboardingError::DuplicateName(_))));
    }

    // Compile-time check that AgentError conversions stay usable in fakes.
    #[test]
    fn test_agent_error_display() {
        let err = AgentError::ProvisioningFailed("exit 1".to_string());
        assert!(err.to_string().contains("exit 1"));
    }
}
