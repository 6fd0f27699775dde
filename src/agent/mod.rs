//! Agent lifecycle collaborator: deploys/uninstalls the monitoring agent on a
//! remote host. Deployment is one opaque remote-provisioning operation with a
//! boolean success contract, not a script-execution engine.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::probe::session::SshSession;
use crate::probe::{Credentials, ProbeError, CONNECT_TIMEOUT};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("SSH connection failed: {0}")]
    ConnectionFailed(String),
    #[error("remote provisioning failed: {0}")]
    ProvisioningFailed(String),
    #[error("agent task failed: {0}")]
    TaskFailed(String),
}

impl From<ProbeError> for AgentError {
    fn from(err: ProbeError) -> Self {
        AgentError::ConnectionFailed(err.to_string())
    }
}

#[async_trait]
pub trait AgentLifecycle: Send + Sync {
    /// Installs the monitoring agent on the host the credentials point at.
    /// The agent authenticates its metric callbacks to `callback_url` with
    /// `api_token`.
    async fn deploy_agent(
        &self,
        credentials: &Credentials,
        resource_id: i32,
        api_token: &str,
        callback_url: &str,
    ) -> Result<(), AgentError>;

    /// Removes a previously installed agent from the host.
    async fn uninstall_agent(&self, credentials: &Credentials) -> Result<(), AgentError>;
}

/// Provisions agents over SSH with a single install/uninstall command.
pub struct SshAgentClient {
    connect_timeout: Duration,
}

impl SshAgentClient {
    pub fn new() -> Self {
        SshAgentClient {
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    async fn run_remote(&self, credentials: &Credentials, command: String) -> Result<(), AgentError> {
        let credentials = credentials.clone();
        let timeout = self.connect_timeout;

        let exit_status = tokio::task::spawn_blocking(move || {
            let mut session = SshSession::open(&credentials, timeout)?;
            session
                .exec_status(&command)
                .map_err(|e| ProbeError::ConnectionFailed(e.to_string()))
        })
        .await
        .map_err(|e| AgentError::TaskFailed(e.to_string()))??;

        if exit_status != 0 {
            return Err(AgentError::ProvisioningFailed(format!(
                "remote command exited with status {exit_status}"
            )));
        }
        Ok(())
    }
}

impl Default for SshAgentClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentLifecycle for SshAgentClient {
    async fn deploy_agent(
        &self,
        credentials: &Credentials,
        resource_id: i32,
        api_token: &str,
        callback_url: &str,
    ) -> Result<(), AgentError> {
        let command = format!(
            "curl -fsSL {callback_url}/api/v1/agent/install.sh | sh -s -- \
             --resource-id {resource_id} --api-token {api_token} --callback-url {callback_url}"
        );
        self.run_remote(credentials, command).await
    }

    async fn uninstall_agent(&self, credentials: &Credentials) -> Result<(), AgentError> {
        let command = "sh /opt/opspro-agent/uninstall.sh".to_string();
        self.run_remote(credentials, command).await
    }
}
