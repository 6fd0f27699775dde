//! Blocking SSH session wrapper. Call sites run this on the blocking worker
//! pool (`tokio::task::spawn_blocking`), never on the async reactor.

use ssh2::Session;
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::detectors::{CommandError, CommandRunner};
use super::{Credentials, ProbeError};

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: i32,
}

/// One authenticated SSH session. Dropping the value disconnects the
/// transport, so the session is released on every exit path.
pub struct SshSession {
    session: Session,
}

impl SshSession {
    /// Opens and authenticates a session. Unknown host keys are accepted
    /// automatically (trust-on-first-use; there is no pinning). Unresolvable
    /// hosts, connect timeouts and authentication failures all collapse into
    /// [`ProbeError::ConnectionFailed`].
    pub fn open(credentials: &Credentials, connect_timeout: Duration) -> Result<Self, ProbeError> {
        let addr = format!("{}:{}", credentials.host, credentials.port);
        let socket_addr = addr
            .to_socket_addrs()
            .map_err(|e| ProbeError::ConnectionFailed(format!("cannot resolve {addr}: {e}")))?
            .next()
            .ok_or_else(|| ProbeError::ConnectionFailed(format!("cannot resolve {addr}")))?;

        let tcp = TcpStream::connect_timeout(&socket_addr, connect_timeout)
            .map_err(|e| ProbeError::ConnectionFailed(format!("connect to {addr}: {e}")))?;
        tcp.set_read_timeout(Some(connect_timeout)).ok();
        tcp.set_write_timeout(Some(connect_timeout)).ok();

        let mut session =
            Session::new().map_err(|e| ProbeError::ConnectionFailed(e.to_string()))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| ProbeError::ConnectionFailed(format!("handshake: {e}")))?;

        if let Some(key) = credentials.private_key.as_deref() {
            session
                .userauth_pubkey_memory(&credentials.username, None, key, None)
                .map_err(|e| ProbeError::ConnectionFailed(format!("key auth: {e}")))?;
        } else if let Some(password) = credentials.password.as_deref() {
            session
                .userauth_password(&credentials.username, password)
                .map_err(|e| ProbeError::ConnectionFailed(format!("password auth: {e}")))?;
        }

        if !session.authenticated() {
            return Err(ProbeError::ConnectionFailed(
                "SSH authentication failed".to_string(),
            ));
        }

        Ok(SshSession { session })
    }

    /// Runs one command to completion, capturing both streams and the exit
    /// status.
    pub fn exec(&mut self, command: &str) -> Result<CommandOutput, CommandError> {
        let mut channel = self
            .session
            .channel_session()
            .map_err(|e| CommandError(format!("open channel: {e}")))?;
        channel
            .exec(command)
            .map_err(|e| CommandError(format!("exec: {e}")))?;

        let mut stdout = String::new();
        channel
            .read_to_string(&mut stdout)
            .map_err(|e| CommandError(format!("read stdout: {e}")))?;
        let mut stderr = String::new();
        channel
            .stderr()
            .read_to_string(&mut stderr)
            .map_err(|e| CommandError(format!("read stderr: {e}")))?;

        channel.wait_close().ok();
        let exit_status = channel.exit_status().unwrap_or(-1);

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_status,
        })
    }

    /// Runs one command and returns its exit status.
    pub fn exec_status(&mut self, command: &str) -> Result<i32, CommandError> {
        self.exec(command).map(|output| output.exit_status)
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        let _ = self.session.disconnect(None, "session closed", None);
    }
}

impl CommandRunner for SshSession {
    fn run(&mut self, command: &str) -> Result<String, CommandError> {
        let output = self.exec(command)?;
        if stderr_is_fatal(&output.stderr) {
            return Err(CommandError(format!(
                "command failed: {}",
                output.stderr.trim()
            )));
        }
        Ok(output.stdout.trim().to_string())
    }
}

/// stderr content only fails a command when it carries a command-not-found
/// class message; any other stderr output is diagnostic noise and tolerated.
fn stderr_is_fatal(stderr: &str) -> bool {
    !stderr.trim().is_empty() && stderr.to_lowercase().contains("command not found")
}
