//! Shared fixtures for integration tests

#![allow(dead_code)]

use ovs_exporter::error::{ExporterError, Result};
use ovs_exporter::source::{BfdStatus, InterfaceRecord, InterfaceSource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory snapshot source returning a fixed result
pub struct StaticSource {
    result: std::result::Result<Vec<InterfaceRecord>, String>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn ok(records: Vec<InterfaceRecord>) -> Self {
        Self {
            result: Ok(records),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InterfaceSource for StaticSource {
    async fn list_interfaces(&self) -> Result<Vec<InterfaceRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Ok(records) => Ok(records.clone()),
            Err(message) => Err(ExporterError::Ovsdb(message.clone())),
        }
    }
}

/// Source that never answers within any reasonable scrape timeout
pub struct SlowSource;

impl InterfaceSource for SlowSource {
    async fn list_interfaces(&self) -> Result<Vec<InterfaceRecord>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(vec![tunnel_interface()])
    }
}

/// A plain internal port: admin up, MAC known, two counters, no BFD
pub fn plain_interface() -> InterfaceRecord {
    let mut iface = InterfaceRecord::new("br-int");
    iface.admin_state = Some("up".to_string());
    iface.mac_in_use = Some("aa:bb:cc:dd:ee:ff".to_string());
    iface.statistics.insert("rx_bytes".to_string(), 100);
    iface.statistics.insert("tx_bytes".to_string(), 0);
    iface
}

/// A Geneve tunnel with BFD enabled and every optional field set
pub fn tunnel_interface() -> InterfaceRecord {
    let mut iface = InterfaceRecord::new("ovn-abc123-0");
    iface.admin_state = Some("up".to_string());
    iface.mac_in_use = Some("fe:54:00:12:34:56".to_string());
    iface.remote_ip = Some("10.0.0.2".to_string());
    iface.bfd = BfdStatus {
        state: Some("up".to_string()),
        forwarding: Some("true".to_string()),
        remote_state: Some("up".to_string()),
        flap_count: Some("3".to_string()),
    };
    iface.statistics.insert("rx_packets".to_string(), 42);
    iface.tunnel_egress_carrier = Some("up".to_string());
    iface
}
