//! Prometheus Metrics Definitions
//!
//! This module defines the fixed schema of the seven metric families exposed by the
//! exporter, and renders a scrape's samples in the Prometheus text format.
//!
//! # Metric Families
//!
//! | Metric | Labels | Type |
//! |--------|--------|------|
//! | `ovs_interface_admin_state` | name, mac | gauge |
//! | `ovs_interface_bfd_state` | name, remote_ip | gauge |
//! | `ovs_interface_bfd_forwarding` | name, remote_ip | gauge |
//! | `ovs_interface_bfd_remote_state` | name, remote_ip | gauge |
//! | `ovs_interface_bfd_flap_count` | name, remote_ip | gauge |
//! | `ovs_interface_statistics` | name, mac, statistic_name | counter |
//! | `ovs_interface_status_tunnel_egress_carrier` | name, remote_ip | gauge |
//!
//! # Rendering
//!
//! Samples never live in a long-lived registry. Each scrape builds fresh metric vectors
//! from its own sample set, so nothing from a previous scrape can leak into the next.
//! Families without samples are omitted from the output.

use crate::error::Result;
use prometheus::core::{Collector, Desc};
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use tracing::{error, warn};

/// Namespace prefix shared by every metric name
pub const NAMESPACE: &str = "ovs";

const NAME_MAC: &[&str] = &["name", "mac"];
const NAME_REMOTE_IP: &[&str] = &["name", "remote_ip"];
const NAME_MAC_STATISTIC: &[&str] = &["name", "mac", "statistic_name"];

/// The metric families this exporter can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    AdminState,
    BfdState,
    BfdForwarding,
    BfdRemoteState,
    BfdFlapCount,
    Statistics,
    StatusTunnelEgressCarrier,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::AdminState,
        Metric::BfdState,
        Metric::BfdForwarding,
        Metric::BfdRemoteState,
        Metric::BfdFlapCount,
        Metric::Statistics,
        Metric::StatusTunnelEgressCarrier,
    ];

    fn descriptor(self) -> Descriptor {
        let (name, help, labels, kind) = match self {
            Metric::AdminState => (
                "interface_admin_state",
                "Interface admin state",
                NAME_MAC,
                ValueKind::Gauge,
            ),
            Metric::BfdState => (
                "interface_bfd_state",
                "Interface BFD state (-3 = unknown, -2 = admin_down, -1 = down, 0 = init, 1 = up)",
                NAME_REMOTE_IP,
                ValueKind::Gauge,
            ),
            Metric::BfdForwarding => (
                "interface_bfd_forwarding",
                "Interface BFD forwarding",
                NAME_REMOTE_IP,
                ValueKind::Gauge,
            ),
            Metric::BfdRemoteState => (
                "interface_bfd_remote_state",
                "Interface BFD remote state (-3 = unkown, -2 = admin_down, -1 = down, 0 = init, 1 = up)",
                NAME_REMOTE_IP,
                ValueKind::Gauge,
            ),
            Metric::BfdFlapCount => (
                "interface_bfd_flap_count",
                "Interface BFD flap count",
                NAME_REMOTE_IP,
                ValueKind::Gauge,
            ),
            Metric::Statistics => (
                "interface_statistics",
                "Interface statistics",
                NAME_MAC_STATISTIC,
                ValueKind::Counter,
            ),
            Metric::StatusTunnelEgressCarrier => (
                "interface_status_tunnel_egress_carrier",
                "Carrier status of the tunnel egress interface",
                NAME_REMOTE_IP,
                ValueKind::Gauge,
            ),
        };

        Descriptor {
            metric: self,
            name,
            help,
            labels,
            kind,
        }
    }
}

/// Prometheus value type of a metric family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Gauge,
    Counter,
}

/// Immutable description of one metric family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub metric: Metric,
    /// Name without the namespace prefix
    pub name: &'static str,
    pub help: &'static str,
    /// Label names, in the order samples must supply their values
    pub labels: &'static [&'static str],
    pub kind: ValueKind,
}

impl Descriptor {
    /// Fully qualified name, e.g. `ovs_interface_admin_state`
    pub fn fq_name(&self) -> String {
        format!("{}_{}", NAMESPACE, self.name)
    }

    fn opts(&self) -> Opts {
        Opts::new(self.name, self.help).namespace(NAMESPACE)
    }

    /// Validated Prometheus descriptor
    pub fn to_desc(&self) -> Result<Desc> {
        let labels = self.labels.iter().map(|l| l.to_string()).collect();
        Ok(Desc::new(
            self.fq_name(),
            self.help.to_string(),
            labels,
            HashMap::new(),
        )?)
    }
}

/// The complete, fixed catalog of metric families
#[derive(Debug, Clone)]
pub struct Schema {
    descriptors: Vec<Descriptor>,
}

impl Schema {
    pub fn new() -> Self {
        Self {
            descriptors: Metric::ALL.iter().map(|m| m.descriptor()).collect(),
        }
    }

    /// All descriptors, in [`Metric::ALL`] order. Never touches the database.
    pub fn describe(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn get(&self, metric: Metric) -> &Descriptor {
        &self.descriptors[metric as usize]
    }

    /// Convert every descriptor into a Prometheus `Desc`, failing on the first invalid one
    pub fn descs(&self) -> Result<Vec<Desc>> {
        self.descriptors.iter().map(Descriptor::to_desc).collect()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

/// One derived value, produced fresh per scrape
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub metric: Metric,
    pub kind: ValueKind,
    pub value: f64,
    /// Values for the descriptor's labels, same count and order
    pub labels: Vec<String>,
}

impl Sample {
    pub fn gauge(metric: Metric, value: f64, labels: Vec<String>) -> Self {
        Self {
            metric,
            kind: ValueKind::Gauge,
            value,
            labels,
        }
    }

    pub fn counter(metric: Metric, value: f64, labels: Vec<String>) -> Self {
        Self {
            metric,
            kind: ValueKind::Counter,
            value,
            labels,
        }
    }

    /// Label value for `label`, if the metric declares it
    pub fn label(&self, schema: &Schema, label: &str) -> Option<&str> {
        schema
            .get(self.metric)
            .labels
            .iter()
            .position(|l| *l == label)
            .and_then(|i| self.labels.get(i))
            .map(String::as_str)
    }
}

enum Family {
    Gauge(GaugeVec),
    Counter(CounterVec),
}

impl Family {
    fn new(descriptor: &Descriptor) -> Result<Self> {
        Ok(match descriptor.kind {
            ValueKind::Gauge => Family::Gauge(GaugeVec::new(descriptor.opts(), descriptor.labels)?),
            ValueKind::Counter => {
                Family::Counter(CounterVec::new(descriptor.opts(), descriptor.labels)?)
            }
        })
    }

    fn collector(&self) -> Box<dyn Collector> {
        match self {
            Family::Gauge(vec) => Box::new(vec.clone()),
            Family::Counter(vec) => Box::new(vec.clone()),
        }
    }

    fn record(&self, sample: &Sample) -> Result<()> {
        let values: Vec<&str> = sample.labels.iter().map(String::as_str).collect();
        match self {
            Family::Gauge(vec) => vec
                .get_metric_with_label_values(values.as_slice())?
                .set(sample.value),
            Family::Counter(vec) => vec
                .get_metric_with_label_values(values.as_slice())?
                .inc_by(sample.value),
        }
        Ok(())
    }
}

/// Render samples in Prometheus text format
pub fn render(schema: &Schema, samples: &[Sample]) -> anyhow::Result<String> {
    let registry = Registry::new();
    let families = schema
        .describe()
        .iter()
        .map(Family::new)
        .collect::<Result<Vec<_>>>()?;

    for family in &families {
        registry.register(family.collector())?;
    }

    for sample in samples {
        let descriptor = schema.get(sample.metric);
        if descriptor.kind == ValueKind::Counter && sample.value < 0.0 {
            warn!(
                "Dropping negative counter sample for {} {:?}: {}",
                descriptor.fq_name(),
                sample.labels,
                sample.value
            );
            continue;
        }
        if let Err(e) = families[sample.metric as usize].record(sample) {
            error!("Dropping sample for {}: {}", descriptor.fq_name(), e);
        }
    }

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
