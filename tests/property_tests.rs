//! Property tests: snapshot shape always mirrors the registry

mod common;

use common::SimulatedNetwork;
use hostwatch::{HostEntry, HostWatch, LivenessStatus, WatchConfig};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_one_record_per_entry(
        hosts in prop::collection::btree_map(1u8..=254, any::<bool>(), 1..12),
        ports in prop::collection::btree_set(1u16..=65535, 0..6),
    ) {
        let hosts: BTreeMap<String, bool> = hosts
            .into_iter()
            .map(|(octet, up)| (format!("10.20.30.{}", octet), up))
            .collect();
        let ports: Vec<u16> = ports.into_iter().collect();

        let mut network = SimulatedNetwork::new();
        for (address, up) in &hosts {
            if *up {
                network = network.with_host_up(address).with_open_ports(address, &ports);
            }
        }
        let network = network.shared();

        let entries: Vec<HostEntry> = hosts.keys().map(|a| HostEntry::new(a.clone(), format!("h-{}", a))).collect();
        let config = WatchConfig::new(entries)
            .with_ports(ports.clone())
            .with_probe_timeout(50)
            .with_scan_timeout(50);

        let snapshot = runtime().block_on(async {
            let watch = HostWatch::with_probes(config, network.clone(), network).await.unwrap();
            watch.refresh_once().await.unwrap()
        });

        prop_assert_eq!(snapshot.records.len(), hosts.len());

        let addresses: BTreeSet<&str> = snapshot.records.iter().map(|r| r.address.as_str()).collect();
        let expected: BTreeSet<&str> = hosts.keys().map(String::as_str).collect();
        prop_assert_eq!(addresses, expected);

        for record in &snapshot.records {
            let up = hosts[&record.address];
            prop_assert_eq!(record.status == LivenessStatus::Online, up);
            prop_assert!(record.responsive_ports.iter().all(|p| ports.contains(p)));
            if up {
                prop_assert_eq!(&record.responsive_ports, &ports);
            } else {
                prop_assert!(record.responsive_ports.is_empty());
            }
        }
    }
}
