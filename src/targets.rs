//! Host registry and one-time address resolution
//!
//! Every configured address is resolved exactly once, when the registry is
//! built. Entries that fail (malformed literals, unknown hostnames) are kept
//! in the registry as `Target::Invalid` so they still show up as offline in
//! each snapshot, but they are never probed and never re-resolved.

use crate::network::protocol::NetworkUtils;
use crate::{ScanError, ScanResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;

/// One configured host: network address plus display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEntry {
    pub address: String,
    pub name: String,
}

impl HostEntry {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }
}

/// Outcome of resolving a configured address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Resolved(IpAddr),
    Invalid(String),
}

impl Target {
    pub fn ip(&self) -> Option<IpAddr> {
        match self {
            Target::Resolved(ip) => Some(*ip),
            Target::Invalid(_) => None,
        }
    }
}

/// A registry entry together with its resolution outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredHost {
    pub entry: HostEntry,
    pub target: Target,
}

/// Ordered, immutable mapping from address to display name
#[derive(Debug, Clone, Default)]
pub struct HostRegistry {
    hosts: Vec<RegisteredHost>,
}

impl HostRegistry {
    /// Resolve every entry once and build the registry.
    ///
    /// Duplicate addresses are a configuration error for the whole registry;
    /// a single bad address only invalidates its own entry.
    pub async fn resolve(entries: Vec<HostEntry>, lookup_timeout: Duration) -> ScanResult<Self> {
        check_unique(&entries)?;

        let lookups = entries
            .iter()
            .map(|entry| resolve_address(entry.address.trim(), lookup_timeout));
        let targets = futures::future::join_all(lookups).await;

        let hosts: Vec<RegisteredHost> = entries
            .into_iter()
            .zip(targets)
            .map(|(entry, target)| RegisteredHost { entry, target })
            .collect();

        for host in &hosts {
            if let Target::Invalid(reason) = &host.target {
                log::error!(
                    "Host '{}' ({}) will be reported offline: {}",
                    host.entry.name,
                    host.entry.address,
                    reason
                );
            }
        }

        Ok(Self { hosts })
    }

    /// Build a registry from already-resolved entries
    pub fn from_resolved(hosts: Vec<RegisteredHost>) -> ScanResult<Self> {
        let entries: Vec<HostEntry> = hosts.iter().map(|h| h.entry.clone()).collect();
        check_unique(&entries)?;
        Ok(Self { hosts })
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredHost> {
        self.hosts.iter()
    }

    /// Distinct resolved addresses to probe, in registry order
    pub fn probe_addresses(&self) -> Vec<IpAddr> {
        let mut seen = HashSet::new();
        self.hosts
            .iter()
            .filter_map(|h| h.target.ip())
            .filter(|ip| seen.insert(*ip))
            .collect()
    }

    /// Entries that failed resolution
    pub fn invalid_hosts(&self) -> impl Iterator<Item = &RegisteredHost> {
        self.hosts
            .iter()
            .filter(|h| matches!(h.target, Target::Invalid(_)))
    }
}

fn check_unique(entries: &[HostEntry]) -> ScanResult<()> {
    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert(entry.address.trim()) {
            return Err(ScanError::ConfigError(format!(
                "Duplicate host address: {}",
                entry.address
            )));
        }
    }
    Ok(())
}

async fn resolve_address(address: &str, lookup_timeout: Duration) -> Target {
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Target::Resolved(ip);
    }

    if !is_hostname(address) {
        return Target::Invalid(format!("malformed address '{}'", address));
    }

    match tokio::time::timeout(lookup_timeout, NetworkUtils::resolve_hostname(address)).await {
        Ok(Ok(ip)) => Target::Resolved(ip),
        Ok(Err(e)) => Target::Invalid(e.to_string()),
        Err(_) => Target::Invalid(format!("resolving '{}' timed out", address)),
    }
}

/// Syntactic hostname check (RFC 1123 labels, not all-numeric)
fn is_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }

    let labels: Vec<&str> = s.trim_end_matches('.').split('.').collect();
    let well_formed = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });

    // "300.1.2.3" is a broken IPv4 literal, not a name worth looking up
    let all_numeric = labels.iter().all(|l| l.chars().all(|c| c.is_ascii_digit()));

    well_formed && !all_numeric
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_hostname_syntax() {
        assert!(is_hostname("localhost"));
        assert!(is_hostname("printer-2.lan"));
        assert!(!is_hostname("300.1.2.3"));
        assert!(!is_hostname("bad host"));
        assert!(!is_hostname("-leading.example"));
        assert!(!is_hostname(""));
    }

    #[tokio::test]
    async fn test_literal_addresses_resolve_without_lookup() {
        let registry = HostRegistry::resolve(
            vec![
                HostEntry::new("127.0.0.1", "loopback"),
                HostEntry::new("::1", "loopback6"),
            ],
            Duration::from_millis(100),
        )
        .await
        .unwrap();

        let targets: Vec<_> = registry.iter().map(|h| h.target.clone()).collect();
        assert_eq!(targets[0], Target::Resolved(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert!(matches!(targets[1], Target::Resolved(IpAddr::V6(_))));
    }

    #[tokio::test]
    async fn test_malformed_entry_kept_as_invalid() {
        let registry = HostRegistry::resolve(
            vec![
                HostEntry::new("300.1.2.3", "broken"),
                HostEntry::new("10.0.0.1", "fine"),
            ],
            Duration::from_millis(100),
        )
        .await
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.invalid_hosts().count(), 1);
        assert_eq!(registry.probe_addresses(), vec!["10.0.0.1".parse::<IpAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn test_duplicate_addresses_rejected() {
        let result = HostRegistry::resolve(
            vec![HostEntry::new("10.0.0.1", "a"), HostEntry::new("10.0.0.1", "b")],
            Duration::from_millis(100),
        )
        .await;
        assert!(matches!(result, Err(ScanError::ConfigError(_))));
    }

    #[test]
    fn test_probe_addresses_deduplicates_shared_ip() {
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        let registry = HostRegistry::from_resolved(vec![
            RegisteredHost {
                entry: HostEntry::new("127.0.0.1", "loopback"),
                target: Target::Resolved(ip),
            },
            RegisteredHost {
                entry: HostEntry::new("localhost", "by-name"),
                target: Target::Resolved(ip),
            },
        ])
        .unwrap();

        assert_eq!(registry.probe_addresses(), vec![ip]);
    }
}
