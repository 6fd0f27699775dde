//! In-memory fakes for the orchestrator seams.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::agent::{AgentError, AgentLifecycle};
use crate::db::models::{NewResource, Resource};
use crate::probe::{Credentials, HostFingerprint, ProbeError, Prober};

use super::store::{ResourceStore, StoreError};

pub struct MemoryStore {
    rows: Mutex<HashMap<i32, Resource>>,
    next_id: AtomicI32,
    fail_next_insert: Mutex<Option<StoreError>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            rows: Mutex::new(HashMap::new()),
            next_id: AtomicI32::new(1),
            fail_next_insert: Mutex::new(None),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn get(&self, resource_id: i32) -> Option<Resource> {
        self.rows.lock().unwrap().get(&resource_id).cloned()
    }

    pub fn fail_next_insert_with(&self, err: StoreError) {
        *self.fail_next_insert.lock().unwrap() = Some(err);
    }

    /// Inserts a minimal existing resource and returns its id.
    pub fn seed(&self, name: &str) -> i32 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let resource = Resource {
            id,
            name: name.to_string(),
            ip_address: Some("10.0.0.5".to_string()),
            hostname: Some(name.to_string()),
            cpu_cores: Some(4),
            memory_gb: Some(8.0),
            disk_gb: Some(100.0),
            os_type: Some("Linux".to_string()),
            os_version: Some("Unknown".to_string()),
            status: "active".to_string(),
            cpu_usage: 0.0,
            memory_usage: 0.0,
            disk_usage: 0.0,
            encrypted_password: None,
            encrypted_private_key: None,
            description: None,
            created_at: now,
            updated_at: now,
            last_seen: None,
        };
        self.rows.lock().unwrap().insert(id, resource);
        id
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Resource>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn find_by_id(&self, resource_id: i32) -> Result<Option<Resource>, StoreError> {
        Ok(self.get(resource_id))
    }

    async fn insert(&self, new: NewResource) -> Result<Resource, StoreError> {
        if let Some(err) = self.fail_next_insert.lock().unwrap().take() {
            return Err(err);
        }
        let mut rows = self.rows.lock().unwrap();
        if rows.values().any(|r| r.name == new.name) {
            return Err(StoreError::DuplicateName);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let resource = Resource {
            id,
            name: new.name,
            ip_address: new.ip_address,
            hostname: new.hostname,
            cpu_cores: new.cpu_cores,
            memory_gb: new.memory_gb,
            disk_gb: new.disk_gb,
            os_type: new.os_type,
            os_version: new.os_version,
            status: new.status,
            cpu_usage: 0.0,
            memory_usage: 0.0,
            disk_usage: 0.0,
            encrypted_password: new.encrypted_password,
            encrypted_private_key: new.encrypted_private_key,
            description: new.description,
            created_at: now,
            updated_at: now,
            last_seen: None,
        };
        rows.insert(id, resource.clone());
        Ok(resource)
    }

    async fn delete(&self, resource_id: i32) -> Result<bool, StoreError> {
        Ok(self.rows.lock().unwrap().remove(&resource_id).is_some())
    }
}

pub struct ScriptedProber {
    failure: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedProber {
    pub fn succeeding() -> Self {
        ScriptedProber {
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        ScriptedProber {
            failure: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn probe_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, _credentials: &Credentials) -> Result<HostFingerprint, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(ProbeError::ConnectionFailed(message.clone())),
            None => Ok(HostFingerprint {
                hostname: "probed-host".to_string(),
                cpu_cores: 8,
                memory_gb: 16.0,
                disk_gb: 250.0,
                os_type: "Ubuntu".to_string(),
                os_version: "22.04.3 LTS".to_string(),
                kernel_version: "5.15.0-84-generic".to_string(),
            }),
        }
    }
}

pub struct OkAgent {
    deploys: AtomicUsize,
    uninstalls: AtomicUsize,
}

impl OkAgent {
    pub fn new() -> Self {
        OkAgent {
            deploys: AtomicUsize::new(0),
            uninstalls: AtomicUsize::new(0),
        }
    }

    pub fn deploy_calls(&self) -> usize {
        self.deploys.load(Ordering::SeqCst)
    }

    pub fn uninstall_calls(&self) -> usize {
        self.uninstalls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentLifecycle for OkAgent {
    async fn deploy_agent(
        &self,
        _credentials: &Credentials,
        _resource_id: i32,
        _api_token: &str,
        _callback_url: &str,
    ) -> Result<(), AgentError> {
        self.deploys.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn uninstall_agent(&self, _credentials: &Credentials) -> Result<(), AgentError> {
        self.uninstalls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FailingAgent {
    message: String,
}

impl FailingAgent {
    pub fn new(message: &str) -> Self {
        FailingAgent {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl AgentLifecycle for FailingAgent {
    async fn deploy_agent(
        &self,
        _credentials: &Credentials,
        _resource_id: i32,
        _api_token: &str,
        _callback_url: &str,
    ) -> Result<(), AgentError> {
        Err(AgentError::ProvisioningFailed(self.message.clone()))
    }

    async fn uninstall_agent(&self, _credentials: &Credentials) -> Result<(), AgentError> {
        Err(AgentError::ProvisioningFailed(self.message.clone()))
    }
}
