//! TCP connect probing

use crate::network::PortProbe;
use crate::{ScanError, ScanResult};
use std::net::{IpAddr, SocketAddr};

/// TCP connect scanner for non-raw socket scanning.
///
/// A completed three-way handshake means the port is responsive; refusal,
/// reset and unreachable networks all mean it is not. The caller bounds the
/// attempt with its own deadline.
#[derive(Debug, Clone, Default)]
pub struct TcpConnectScanner;

impl TcpConnectScanner {
    pub fn new() -> Self {
        Self
    }

    /// Perform a TCP connect attempt on a single port
    pub async fn scan_port(&self, target: IpAddr, port: u16) -> ScanResult<bool> {
        let addr = SocketAddr::new(target, port);

        match tokio::net::TcpStream::connect(addr).await {
            Ok(stream) => {
                // Connection successful - close quickly
                drop(stream);
                Ok(true)
            }
            Err(e) => match ScanError::from_io(e) {
                err @ ScanError::ResourceExhausted(_) => Err(err),
                err => {
                    log::trace!("{} closed: {}", addr, err);
                    Ok(false)
                }
            },
        }
    }
}

#[async_trait::async_trait]
impl PortProbe for TcpConnectScanner {
    async fn connect(&self, target: IpAddr, port: u16) -> ScanResult<bool> {
        self.scan_port(target, port).await
    }
}
