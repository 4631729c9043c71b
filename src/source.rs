//! Snapshot Source
//!
//! The engine only depends on the [`InterfaceSource`] capability: one call returns
//! every interface record of one consistent database state. The production
//! implementation is [`crate::ovsdb::OvsdbClient`]; tests substitute in-memory sources.

use crate::error::Result;
use std::collections::BTreeMap;
use std::future::Future;

/// Provides point-in-time snapshots of the switch's interface table
pub trait InterfaceSource: Send + Sync {
    /// List all interface records.
    ///
    /// Implementations must return records from a single consistent read.
    fn list_interfaces(&self) -> impl Future<Output = Result<Vec<InterfaceRecord>>> + Send;
}

/// BFD sub-keys of interest, decoded from the `bfd_status` column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BfdStatus {
    pub state: Option<String>,
    pub forwarding: Option<String>,
    pub remote_state: Option<String>,
    /// Raw value; parsed by the flap-count rule so bad input stays per-rule
    pub flap_count: Option<String>,
}

/// One row of the `Interface` table, with property bags already decoded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceRecord {
    pub name: String,
    pub admin_state: Option<String>,
    pub mac_in_use: Option<String>,
    pub bfd: BfdStatus,
    /// `options:remote_ip`, set on tunnel interfaces
    pub remote_ip: Option<String>,
    pub statistics: BTreeMap<String, i64>,
    /// `status:tunnel_egress_iface_carrier`
    pub tunnel_egress_carrier: Option<String>,
}

impl InterfaceRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
