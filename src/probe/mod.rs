//! Remote host fingerprinting over a transient SSH session.

pub mod detectors;
pub mod session;

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use detectors::{detect, detect_os_identity, CommandRunner, CPU_CORES, DISK_GB, MEMORY_GB};
use session::SshSession;

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// SSH connection credentials. Held in memory only for the duration of a
/// probe/deploy/uninstall call; the persistent record stores encrypted copies.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub private_key: Option<String>,
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

impl Credentials {
    /// Checks the invariants the SSH layer relies on: a target host, a
    /// username, and exactly one of password/private key.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("credentials require a target host".to_string());
        }
        if self.username.trim().is_empty() {
            return Err("credentials require a username".to_string());
        }
        match (self.password.as_deref(), self.private_key.as_deref()) {
            (Some(_), Some(_)) => {
                Err("supply either a password or a private key, not both".to_string())
            }
            (None, None) => Err("supply a password or a private key".to_string()),
            _ => Ok(()),
        }
    }
}

// Secrets must never end up in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Structured result of one probe. Immutable once produced; fields that could
/// not be detected carry their conservative defaults.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct HostFingerprint {
    pub hostname: String,
    pub cpu_cores: i32,
    pub memory_gb: f64,
    pub disk_gb: f64,
    pub os_type: String,
    pub os_version: String,
    pub kernel_version: String,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    /// Authentication failure, unreachable host, and connect timeout all
    /// collapse into this variant; callers do not distinguish them.
    #[error("SSH connection failed: {0}")]
    ConnectionFailed(String),
    #[error("host detection failed: {0}")]
    DetectionFailed(String),
    #[error("probe task failed: {0}")]
    TaskFailed(String),
}

#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, credentials: &Credentials) -> Result<HostFingerprint, ProbeError>;
}

/// Probes hosts over SSH. A single connection attempt either yields a session
/// or the whole probe fails; there are no retries.
pub struct SshProber {
    connect_timeout: Duration,
}

impl SshProber {
    pub fn new() -> Self {
        SshProber {
            connect_timeout: CONNECT_TIMEOUT,
        }
    }
}

impl Default for SshProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prober for SshProber {
    async fn probe(&self, credentials: &Credentials) -> Result<HostFingerprint, ProbeError> {
        let credentials = credentials.clone();
        let timeout = self.connect_timeout;

        // ssh2 is a blocking library; the whole battery runs on the blocking
        // worker pool so a slow host never stalls the async reactor.
        tokio::task::spawn_blocking(move || {
            let mut session = SshSession::open(&credentials, timeout)?;
            run_battery(&mut session)
        })
        .await
        .map_err(|e| ProbeError::TaskFailed(e.to_string()))?
    }
}

/// Executes the fixed battery of read-only diagnostic commands against an open
/// session. Every detector except `hostname` degrades to a hard-coded default
/// instead of failing the probe.
fn run_battery<R: CommandRunner>(runner: &mut R) -> Result<HostFingerprint, ProbeError> {
    let hostname = runner
        .run("hostname")
        .map_err(|e| ProbeError::DetectionFailed(e.to_string()))?;

    let cpu_cores = detect(runner, CPU_CORES, 1);
    let memory_gb = detect(runner, MEMORY_GB, 0.0);
    let disk_gb = detect(runner, DISK_GB, 0.0);
    let os = detect_os_identity(runner);

    Ok(HostFingerprint {
        hostname,
        cpu_cores,
        memory_gb,
        disk_gb,
        os_type: os.os_type,
        os_version: os.os_version,
        kernel_version: os.kernel_version,
    })
}
