//! Configuration module for hostwatch

use crate::network::LivenessMethod;
use crate::targets::HostEntry;
use crate::ScanError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure, loaded once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Hosts to watch, in display order
    pub hosts: Vec<HostEntry>,

    /// TCP ports checked on every host, in display order
    pub ports: Vec<u16>,

    /// Liveness probe timeout in milliseconds
    pub probe_timeout_ms: u64,

    /// Port scan timeout in milliseconds
    pub scan_timeout_ms: u64,

    /// Seconds between refresh rounds
    pub refresh_interval_secs: u64,

    /// How liveness is probed
    pub liveness_method: LivenessMethod,

    /// Upper bound on simultaneous probes or connects within one round
    pub max_concurrency: usize,

    /// Display name for this machine's own address, if it should be watched
    pub local_host_name: Option<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            hosts: vec![
                HostEntry::new("8.8.8.8", "google"),
                HostEntry::new("127.0.0.1", "my_loopback"),
                HostEntry::new("10.11.61.132", "offline_machine"),
            ],
            ports: vec![80, 443],
            probe_timeout_ms: 2000,
            scan_timeout_ms: 2000,
            refresh_interval_secs: 30,
            liveness_method: LivenessMethod::Auto,
            max_concurrency: 1024,
            local_host_name: None,
        }
    }
}

impl WatchConfig {
    /// Create a configuration for the given hosts with default settings
    pub fn new(hosts: Vec<HostEntry>) -> Self {
        Self {
            hosts,
            ..Default::default()
        }
    }

    /// Set the ports to check
    pub fn with_ports(mut self, ports: Vec<u16>) -> Self {
        self.ports = ports;
        self
    }

    /// Set the liveness probe timeout
    pub fn with_probe_timeout(mut self, timeout_ms: u64) -> Self {
        self.probe_timeout_ms = timeout_ms;
        self
    }

    /// Set the port scan timeout
    pub fn with_scan_timeout(mut self, timeout_ms: u64) -> Self {
        self.scan_timeout_ms = timeout_ms;
        self
    }

    /// Set the refresh interval
    pub fn with_refresh_interval(mut self, secs: u64) -> Self {
        self.refresh_interval_secs = secs;
        self
    }

    /// Set the per-round concurrency limit
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit;
        self
    }

    /// Set the liveness method
    pub fn with_liveness_method(mut self, method: LivenessMethod) -> Self {
        self.liveness_method = method;
        self
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Load configuration from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ScanError::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let config: WatchConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from ~/.hostwatch.toml, or defaults if absent
    pub fn load_default_config() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let config_path = home_dir.join(".hostwatch.toml");

        if config_path.exists() {
            match Self::from_toml_file(&config_path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    return config;
                }
                Err(e) => log::warn!("Ignoring {}: {}", config_path.display(), e),
            }
        }

        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        let mut seen = HashSet::new();
        for host in &self.hosts {
            if host.address.trim().is_empty() {
                return Err(ScanError::ConfigError(format!(
                    "Host '{}' has an empty address",
                    host.name
                )));
            }
            if !seen.insert(host.address.trim()) {
                return Err(ScanError::ConfigError(format!(
                    "Duplicate host address: {}",
                    host.address
                )));
            }
        }

        let mut seen_ports = HashSet::new();
        for &port in &self.ports {
            if port == 0 {
                return Err(ScanError::ConfigError("Port 0 is not a valid TCP port".to_string()));
            }
            if !seen_ports.insert(port) {
                return Err(ScanError::ConfigError(format!("Duplicate port: {}", port)));
            }
        }

        if self.probe_timeout_ms == 0 || self.scan_timeout_ms == 0 {
            return Err(ScanError::ConfigError("Timeouts must be greater than 0".to_string()));
        }

        if self.max_concurrency == 0 {
            return Err(ScanError::ConfigError(
                "Concurrency limit must be greater than 0".to_string(),
            ));
        }

        if self.refresh_interval_secs == 0 {
            return Err(ScanError::ConfigError(
                "Refresh interval must be greater than 0".to_string(),
            ));
        }

        if self.hosts.is_empty() && self.local_host_name.is_none() {
            log::warn!("No hosts configured; snapshots will be empty");
        }
        if self.ports.is_empty() {
            log::warn!("No ports configured; only liveness will be reported");
        }

        Ok(())
    }
}
