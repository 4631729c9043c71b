//! Interface Extraction Rules
//!
//! Each rule maps one [`InterfaceRecord`] to zero or more samples of a single metric
//! family. Rules are independent: a rule whose key is absent contributes nothing and
//! never affects the others.
//!
//! # Metrics Produced
//! - `ovs_interface_admin_state` - 1 if admin state is `up`, else 0
//!   - Labels: name, mac
//! - `ovs_interface_bfd_state` - Local BFD state, see [`bfd_state_value`]
//!   - Labels: name, remote_ip
//! - `ovs_interface_bfd_forwarding` - 1 if BFD forwarding is `true`, else 0
//!   - Labels: name, remote_ip
//! - `ovs_interface_bfd_remote_state` - Remote BFD state, see [`bfd_state_value`]
//!   - Labels: name, remote_ip
//! - `ovs_interface_bfd_flap_count` - BFD flap count
//!   - Labels: name, remote_ip
//! - `ovs_interface_statistics` - One counter per statistics entry
//!   - Labels: name, mac, statistic_name
//! - `ovs_interface_status_tunnel_egress_carrier` - 1 if carrier is `up`, else 0
//!   - Labels: name, remote_ip

use crate::metrics::{Metric, Sample};
use crate::source::InterfaceRecord;
use tracing::error;

/// Label value used when an interface has no MAC address in use
pub const UNKNOWN_MAC: &str = "unknown";

/// Encoded value for BFD state strings this exporter does not recognize
pub const BFD_STATE_UNKNOWN: f64 = -3.0;

/// An extraction rule
pub type Rule = fn(&InterfaceRecord) -> Vec<Sample>;

/// Every rule, applied in this order to each record
pub const RULES: [Rule; 7] = [
    admin_state,
    bfd_state,
    bfd_forwarding,
    bfd_remote_state,
    bfd_flap_count,
    statistics,
    status_tunnel_egress_carrier,
];

/// MAC label shared by the admin-state and statistics rules
pub fn mac_label(iface: &InterfaceRecord) -> &str {
    iface.mac_in_use.as_deref().unwrap_or(UNKNOWN_MAC)
}

fn remote_ip_label(iface: &InterfaceRecord) -> &str {
    iface.remote_ip.as_deref().unwrap_or_default()
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

/// Encode a BFD state string
///
/// `admin_down` → -2, `down` → -1, `init` → 0, `up` → 1, anything else → -3.
pub fn bfd_state_value(state: &str) -> f64 {
    match state {
        "admin_down" => -2.0,
        "down" => -1.0,
        "init" => 0.0,
        "up" => 1.0,
        _ => BFD_STATE_UNKNOWN,
    }
}

/// Gauge labelled by interface name and tunnel remote IP
fn remote_gauge(metric: Metric, iface: &InterfaceRecord, value: f64) -> Vec<Sample> {
    vec![Sample::gauge(
        metric,
        value,
        vec![iface.name.clone(), remote_ip_label(iface).to_string()],
    )]
}

pub fn admin_state(iface: &InterfaceRecord) -> Vec<Sample> {
    let value = flag(iface.admin_state.as_deref() == Some("up"));
    vec![Sample::gauge(
        Metric::AdminState,
        value,
        vec![iface.name.clone(), mac_label(iface).to_string()],
    )]
}

pub fn bfd_state(iface: &InterfaceRecord) -> Vec<Sample> {
    match &iface.bfd.state {
        Some(state) => remote_gauge(Metric::BfdState, iface, bfd_state_value(state)),
        None => Vec::new(),
    }
}

pub fn bfd_forwarding(iface: &InterfaceRecord) -> Vec<Sample> {
    match &iface.bfd.forwarding {
        Some(forwarding) => remote_gauge(Metric::BfdForwarding, iface, flag(forwarding == "true")),
        None => Vec::new(),
    }
}

pub fn bfd_remote_state(iface: &InterfaceRecord) -> Vec<Sample> {
    match &iface.bfd.remote_state {
        Some(state) => remote_gauge(Metric::BfdRemoteState, iface, bfd_state_value(state)),
        None => Vec::new(),
    }
}

pub fn bfd_flap_count(iface: &InterfaceRecord) -> Vec<Sample> {
    let Some(raw) = &iface.bfd.flap_count else {
        return Vec::new();
    };

    match raw.parse::<f64>() {
        Ok(count) if count.is_finite() => remote_gauge(Metric::BfdFlapCount, iface, count),
        Ok(count) => {
            error!(
                "Error parsing BFD flap count for interface {}: non-finite value {}",
                iface.name, count
            );
            Vec::new()
        }
        Err(e) => {
            error!(
                "Error parsing BFD flap count {:?} for interface {}: {}",
                raw, iface.name, e
            );
            Vec::new()
        }
    }
}

pub fn statistics(iface: &InterfaceRecord) -> Vec<Sample> {
    let mac = mac_label(iface);
    iface
        .statistics
        .iter()
        .map(|(stat, value)| {
            Sample::counter(
                Metric::Statistics,
                *value as f64,
                vec![iface.name.clone(), mac.to_string(), stat.clone()],
            )
        })
        .collect()
}

pub fn status_tunnel_egress_carrier(iface: &InterfaceRecord) -> Vec<Sample> {
    match &iface.tunnel_egress_carrier {
        Some(carrier) => remote_gauge(
            Metric::StatusTunnelEgressCarrier,
            iface,
            flag(carrier == "up"),
        ),
        None => Vec::new(),
    }
}
