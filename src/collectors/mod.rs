//! Metrics Collectors
//!
//! This module contains the mapping and collection engine. On each scrape it reads one
//! snapshot of the interface table and projects every record into samples using the
//! fixed list of extraction rules in [`interface::RULES`].
//!
//! # Architecture
//!
//! - [`InterfaceCollector`] owns the [`Schema`] and a [`InterfaceSource`]
//! - `describe()` returns the schema without any I/O
//! - `collect()` reads a snapshot, applies every rule to every record, and pushes the
//!   resulting samples into a caller-supplied sink
//!
//! # Error Handling
//!
//! A failed or timed out snapshot read is non-fatal: it is logged and the scrape gets
//! zero samples. Nothing is cached, so the next scrape starts fresh.

use crate::error::ExporterError;
use crate::metrics::{Descriptor, Sample, Schema};
use crate::source::{InterfaceRecord, InterfaceSource};
use std::time::Duration;
use tracing::{debug, error, warn};

pub mod interface;

/// Status of a metrics collection operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    /// A snapshot was read and every record was processed
    Success,
    /// The snapshot read failed (already logged); no samples were emitted
    Failed,
}

/// Awaits a snapshot query and hands its data to `process`
///
/// - On success: processes data, returns `CollectionStatus::Success`
/// - On error: logs it, returns `CollectionStatus::Failed` without calling `process`
pub async fn collect_with_handler<T, F, P, E>(
    name: &str,
    query_future: F,
    process: P,
) -> CollectionStatus
where
    F: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: FnOnce(T),
{
    match query_future.await {
        Ok(data) => {
            process(data);
            debug!("Updated {} metrics", name);
            CollectionStatus::Success
        }
        Err(e) => {
            error!("Error listing {}: {}", name, e);
            CollectionStatus::Failed
        }
    }
}

/// Collects interface metrics from a snapshot source
pub struct InterfaceCollector<S> {
    schema: Schema,
    source: S,
    timeout: Duration,
}

impl<S: InterfaceSource> InterfaceCollector<S> {
    pub fn new(schema: Schema, source: S, timeout: Duration) -> Self {
        Self {
            schema,
            source,
            timeout,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// The fixed metric schema, independent of database state
    pub fn describe(&self) -> &[Descriptor] {
        self.schema.describe()
    }

    /// Read one snapshot and push every derived sample into `sink`
    ///
    /// All samples of one call come from the same snapshot. On failure nothing is
    /// pushed.
    pub async fn collect<E: Extend<Sample>>(&self, sink: &mut E) -> CollectionStatus {
        let query = async {
            match tokio::time::timeout(self.timeout, self.source.list_interfaces()).await {
                Ok(result) => result,
                Err(_) => Err(ExporterError::Timeout(self.timeout)),
            }
        };

        let process = |interfaces: Vec<InterfaceRecord>| {
            for iface in &interfaces {
                collect_record(iface, sink);
            }
        };

        collect_with_handler("interfaces", query, process).await
    }

    /// Convenience wrapper returning the samples of one scrape
    pub async fn collect_samples(&self) -> (CollectionStatus, Vec<Sample>) {
        let mut samples = Vec::new();
        let status = self.collect(&mut samples).await;
        (status, samples)
    }
}

fn collect_record<E: Extend<Sample>>(iface: &InterfaceRecord, sink: &mut E) {
    if iface.mac_in_use.is_none() {
        warn!(
            "MAC address missing for interface {}, reporting mac={:?}",
            iface.name,
            interface::UNKNOWN_MAC
        );
    }
    for rule in interface::RULES {
        sink.extend(rule(iface));
    }
}
