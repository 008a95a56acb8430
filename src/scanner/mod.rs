//! Scanner module: concurrent liveness probing and port scanning
//!
//! Both components share the same round discipline: one task per unit of
//! work, a single deadline measured from round start, and a join point that
//! collects whatever settled before the deadline.

pub mod liveness;
pub mod ports;

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

pub use liveness::LivenessProber;
pub use ports::PortScanner;

/// Addresses that answered a liveness probe in one round
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LivenessResult {
    alive: HashSet<IpAddr>,
}

impl LivenessResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: IpAddr) {
        self.alive.insert(address);
    }

    pub fn is_alive(&self, address: &IpAddr) -> bool {
        self.alive.contains(address)
    }

    pub fn len(&self) -> usize {
        self.alive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alive.is_empty()
    }
}

/// Responsive ports per address for one round.
///
/// Every scanned address is a key, with an empty list when nothing answered.
/// Port lists follow the order of the configured port set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortScanResult {
    open: HashMap<IpAddr, Vec<u16>>,
}

impl PortScanResult {
    /// Build the result from raw successes, ordering each list by `ports`
    pub fn from_successes(
        addresses: &[IpAddr],
        ports: &[u16],
        successes: &HashSet<(IpAddr, u16)>,
    ) -> Self {
        let open = addresses
            .iter()
            .map(|&address| {
                let responsive = ports
                    .iter()
                    .copied()
                    .filter(|&port| successes.contains(&(address, port)))
                    .collect();
                (address, responsive)
            })
            .collect();

        Self { open }
    }

    /// Responsive ports for `address`, or `None` if it was not scanned
    pub fn ports_for(&self, address: &IpAddr) -> Option<&[u16]> {
        self.open.get(address).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Total number of responsive (address, port) pairs
    pub fn open_count(&self) -> usize {
        self.open.values().map(Vec::len).sum()
    }
}

/// Deduplicate while keeping first-seen order
pub(crate) fn unique_addresses(addresses: &[IpAddr]) -> Vec<IpAddr> {
    let mut seen = HashSet::new();
    addresses.iter().copied().filter(|a| seen.insert(*a)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_port_result_keeps_configured_order() {
        let successes: HashSet<_> = [(ip(1), 443), (ip(1), 22), (ip(1), 80)].into_iter().collect();
        let result = PortScanResult::from_successes(&[ip(1)], &[443, 80, 22], &successes);

        assert_eq!(result.ports_for(&ip(1)), Some(&[443, 80, 22][..]));
    }

    #[test]
    fn test_silent_address_still_present() {
        let result = PortScanResult::from_successes(&[ip(1), ip(2)], &[80], &HashSet::new());

        assert_eq!(result.len(), 2);
        assert_eq!(result.ports_for(&ip(2)), Some(&[][..]));
        assert_eq!(result.open_count(), 0);
        assert_eq!(result.ports_for(&ip(3)), None);
    }

    #[test]
    fn test_unique_addresses_preserves_order() {
        assert_eq!(unique_addresses(&[ip(3), ip(1), ip(3), ip(2)]), vec![ip(3), ip(1), ip(2)]);
    }
}
