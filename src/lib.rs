//! Open vSwitch Prometheus Exporter
//!
//! Republishes the operational state of every row in the Open vSwitch `Interface`
//! table as Prometheus metrics.
//!
//! # Overview
//!
//! On each scrape the exporter reads one snapshot of the interface table from
//! `ovsdb-server`, maps every record through a fixed set of extraction rules, and
//! renders the resulting samples in the Prometheus text format. Nothing is retained
//! between scrapes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   JSON-RPC (unix/tcp) ┌──────────────┐
//! │ ovsdb-server│ ◄──────────────────►  │   Exporter   │
//! │             │   transact/select     │              │
//! └─────────────┘                       │  ┌────────┐  │      HTTP      ┌────────────┐
//!                                       │  │ Source │  │ ◄────────────► │ Prometheus │
//!                                       │  └────────┘  │   /metrics     └────────────┘
//!                                       │  ┌────────┐  │
//!                                       │  │ Rules  │  │
//!                                       │  └────────┘  │
//!                                       └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`source`] - Snapshot source trait and the typed interface record
//! - [`ovsdb`] - OVSDB JSON-RPC client implementing the source
//! - [`collectors`] - Mapping and collection engine, extraction rules
//! - [`metrics`] - Metric schema and text rendering
//! - [`server`] - HTTP server
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use ovs_exporter::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     server::start(config).await?;
//!     Ok(())
//! }
//! ```

pub mod collectors;
pub mod config;
pub mod error;
pub mod metrics;
pub mod ovsdb;
pub mod server;
pub mod source;
