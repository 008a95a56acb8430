//! Network probes: ICMP echo, system ping and TCP connect

pub mod icmp;
pub mod ping;
pub mod protocol;
pub mod socket;

use crate::ScanResult;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Available liveness probing methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LivenessMethod {
    /// Raw ICMP echo, falling back to the system ping when not privileged
    Auto,
    /// Raw ICMP echo request/reply
    Icmp,
    /// The platform `ping` command
    System,
}

impl LivenessMethod {
    /// Get the name of the liveness method
    pub fn name(&self) -> &'static str {
        match self {
            LivenessMethod::Auto => "auto",
            LivenessMethod::Icmp => "icmp",
            LivenessMethod::System => "system",
        }
    }
}

impl std::fmt::Display for LivenessMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for LivenessMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(LivenessMethod::Auto),
            "icmp" | "raw" => Ok(LivenessMethod::Icmp),
            "system" | "ping" => Ok(LivenessMethod::System),
            _ => Err(format!("Unknown liveness method: {}", s)),
        }
    }
}

/// A single reachability check against one address.
///
/// `Ok(false)` and ordinary `Err`s both mean "no response"; only errors for
/// which `ScanError::is_round_fatal` holds abort the round.
#[async_trait::async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn echo(&self, target: IpAddr, timeout: Duration) -> ScanResult<bool>;
    fn method_name(&self) -> &str;
}

/// A single TCP connection attempt against one (address, port) pair
#[async_trait::async_trait]
pub trait PortProbe: Send + Sync {
    async fn connect(&self, target: IpAddr, port: u16) -> ScanResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liveness_method_parsing() {
        assert_eq!("AUTO".parse::<LivenessMethod>(), Ok(LivenessMethod::Auto));
        assert_eq!("ping".parse::<LivenessMethod>(), Ok(LivenessMethod::System));
        assert_eq!("raw".parse::<LivenessMethod>(), Ok(LivenessMethod::Icmp));
        assert!("arp".parse::<LivenessMethod>().is_err());
    }
}
