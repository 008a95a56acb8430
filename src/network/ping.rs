//! Liveness through the platform `ping` command
//!
//! Used when raw sockets are not available. The child is killed when the
//! probe future is dropped, so the round deadline also bounds the process.

use crate::network::LivenessProbe;
use crate::{ScanError, ScanResult};
use std::net::IpAddr;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct SystemPinger {
    program: String,
}

impl Default for SystemPinger {
    fn default() -> Self {
        Self {
            program: "ping".to_string(),
        }
    }
}

impl SystemPinger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different ping executable
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments for one echo request with the given wait
    fn arguments(target: IpAddr, timeout: Duration) -> Vec<String> {
        let mut args = vec!["-c".to_string(), "1".to_string()];

        // -W is seconds on Linux and milliseconds on macOS/BSD
        if cfg!(any(target_os = "macos", target_os = "freebsd")) {
            args.push("-W".to_string());
            args.push(timeout.as_millis().max(1).to_string());
        } else {
            let secs = (timeout.as_millis() + 999) / 1000;
            args.push("-W".to_string());
            args.push(secs.max(1).to_string());
        }

        if target.is_ipv6() && cfg!(target_os = "linux") {
            args.push("-6".to_string());
        }

        args.push(target.to_string());
        args
    }
}

#[async_trait::async_trait]
impl LivenessProbe for SystemPinger {
    async fn echo(&self, target: IpAddr, timeout: Duration) -> ScanResult<bool> {
        let status = Command::new(&self.program)
            .args(Self::arguments(target, timeout))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ScanError::ConfigError(format!("'{}' not found on PATH", self.program))
                } else {
                    ScanError::from_io(e)
                }
            })?;

        Ok(status.success())
    }

    fn method_name(&self) -> &str {
        "system-ping"
    }
}
