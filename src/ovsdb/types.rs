//! OVSDB Wire Type Definitions
//!
//! Rust definitions for the JSON-RPC envelope used by `ovsdb-server` (RFC 7047) and for
//! the `Interface` table rows this exporter selects.
//!
//! # Design Notes
//!
//! - **Sets**: a column holding at most one value is encoded either as the bare atom or
//!   as `["set", [...]]`; [`OvsdbSet`] accepts both.
//! - **Maps**: encoded as `["map", [[key, value], ...]]`; see [`OvsdbMap`].
//! - **Defaults**: every column except `name` falls back to empty, so a server that omits
//!   a column never fails the whole snapshot.

use crate::source::{BfdStatus, InterfaceRecord};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Table holding one row per switch interface
pub const INTERFACE_TABLE: &str = "Interface";

/// Columns read by the exporter, nothing else is transferred
pub const INTERFACE_COLUMNS: [&str; 7] = [
    "name",
    "admin_state",
    "mac_in_use",
    "bfd_status",
    "options",
    "statistics",
    "status",
];

/// JSON-RPC 1.0 request
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest {
    pub method: String,
    pub params: Value,
    pub id: Value,
}

/// JSON-RPC 1.0 response, sent when answering server `echo` probes
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub result: Value,
    pub error: Value,
    pub id: Value,
}

/// Any message received from the server: a response, a request, or a notification
#[derive(Debug, Deserialize)]
pub struct JsonRpcMessage {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Value,
}

/// `select` operation inside a `transact` call
#[derive(Debug, Serialize)]
pub struct SelectOperation<'a> {
    pub op: &'static str,
    pub table: &'a str,
    #[serde(rename = "where")]
    pub conditions: Vec<Value>,
    pub columns: &'a [&'a str],
}

impl<'a> SelectOperation<'a> {
    /// Select every row of `table`, restricted to `columns`
    pub fn all(table: &'a str, columns: &'a [&'a str]) -> Self {
        Self {
            op: "select",
            table,
            conditions: Vec::new(),
            columns,
        }
    }
}

/// Result of the `select` operation on the `Interface` table
#[derive(Debug, Deserialize)]
pub struct InterfaceSelectResult {
    #[serde(default)]
    pub rows: Vec<InterfaceRow>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

/// One `Interface` row as transferred on the wire
#[derive(Debug, Deserialize, Clone)]
pub struct InterfaceRow {
    pub name: String,
    #[serde(default)]
    pub admin_state: OvsdbSet<String>,
    #[serde(default)]
    pub mac_in_use: OvsdbSet<String>,
    #[serde(default)]
    pub bfd_status: OvsdbMap<String>,
    #[serde(default)]
    pub options: OvsdbMap<String>,
    #[serde(default)]
    pub statistics: OvsdbMap<i64>,
    #[serde(default)]
    pub status: OvsdbMap<String>,
}

/// OVSDB set value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OvsdbSet<T>(pub Vec<T>);

impl<T> OvsdbSet<T> {
    /// First element, for columns declared with at most one value
    pub fn into_option(self) -> Option<T> {
        self.0.into_iter().next()
    }
}

impl<T> Default for OvsdbSet<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OvsdbSet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr<T> {
            Set(String, Vec<T>),
            Atom(T),
        }

        match Repr::<T>::deserialize(deserializer)? {
            Repr::Set(tag, items) if tag == "set" => Ok(OvsdbSet(items)),
            Repr::Set(tag, _) => Err(de::Error::custom(format!(
                "expected OVSDB set, found {:?}",
                tag
            ))),
            Repr::Atom(atom) => Ok(OvsdbSet(vec![atom])),
        }
    }
}

/// OVSDB map value with string keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OvsdbMap<V>(pub BTreeMap<String, V>);

impl<V> Default for OvsdbMap<V> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OvsdbMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (tag, pairs) = <(String, Vec<(String, V)>)>::deserialize(deserializer)?;
        if tag != "map" {
            return Err(de::Error::custom(format!(
                "expected OVSDB map, found {:?}",
                tag
            )));
        }
        Ok(OvsdbMap(pairs.into_iter().collect()))
    }
}

impl From<InterfaceRow> for InterfaceRecord {
    fn from(row: InterfaceRow) -> Self {
        let mut bfd_status = row.bfd_status.0;
        let mut options = row.options.0;
        let mut status = row.status.0;

        InterfaceRecord {
            name: row.name,
            admin_state: row.admin_state.into_option(),
            mac_in_use: row.mac_in_use.into_option(),
            bfd: BfdStatus {
                state: bfd_status.remove("state"),
                forwarding: bfd_status.remove("forwarding"),
                remote_state: bfd_status.remove("remote_state"),
                flap_count: bfd_status.remove("flap_count"),
            },
            remote_ip: options.remove("remote_ip"),
            statistics: row.statistics.0,
            tunnel_egress_carrier: status.remove("tunnel_egress_iface_carrier"),
        }
    }
}
