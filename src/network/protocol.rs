//! Address utilities shared by the registry and the binary

use crate::ScanError;
use std::net::{IpAddr, UdpSocket};

/// Network utilities
pub struct NetworkUtils;

impl NetworkUtils {
    /// Get the address this machine uses for outbound traffic.
    ///
    /// Connecting a UDP socket only selects a route; no packet is sent.
    pub fn get_local_ip() -> crate::Result<IpAddr> {
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(ScanError::from_io)?;
        socket.connect("8.8.8.8:80").map_err(ScanError::from_io)?;

        let local_addr = socket.local_addr().map_err(ScanError::from_io)?;
        if local_addr.ip().is_unspecified() {
            return Err(ScanError::NetworkError("No route to determine local address".to_string()));
        }

        Ok(local_addr.ip())
    }

    /// Resolve a hostname, preferring IPv4 results
    pub async fn resolve_hostname(hostname: &str) -> crate::Result<IpAddr> {
        let addrs: Vec<IpAddr> = tokio::net::lookup_host((hostname, 0))
            .await
            .map_err(|e| ScanError::InvalidTarget(format!("cannot resolve '{}': {}", hostname, e)))?
            .map(|addr| addr.ip())
            .collect();

        addrs
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| ScanError::InvalidTarget(format!("'{}' has no addresses", hostname)))
    }
}
