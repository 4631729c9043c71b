//! OVSDB Client
//!
//! This module provides the snapshot source backed by `ovsdb-server`. Every snapshot is
//! a single `transact` containing one `select` on the `Interface` table, so all rows of
//! a snapshot reflect one database state.
//!
//! # Example
//!
//! ```no_run
//! use ovs_exporter::config::OvsdbConfig;
//! use ovs_exporter::ovsdb::OvsdbClient;
//! use ovs_exporter::source::InterfaceSource;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = OvsdbClient::new(&OvsdbConfig::default())?;
//! client.connect().await?;
//! let interfaces = client.list_interfaces().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::OvsdbConfig;
use crate::error::{ExporterError, Result};
use crate::ovsdb::connection::{ConnectionManager, Endpoint};
use crate::ovsdb::types::{
    InterfaceRow, InterfaceSelectResult, SelectOperation, INTERFACE_COLUMNS, INTERFACE_TABLE,
};
use crate::source::{InterfaceRecord, InterfaceSource};
use serde_json::json;
use tracing::debug;

/// Client for the OVSDB JSON-RPC protocol
///
/// Shares one `ConnectionManager` across all scrapes; requests are serialized on it.
pub struct OvsdbClient {
    connection_manager: ConnectionManager,
    database: String,
}

impl OvsdbClient {
    pub fn new(config: &OvsdbConfig) -> Result<Self> {
        let endpoint: Endpoint = config.endpoint.parse()?;
        Ok(Self {
            connection_manager: ConnectionManager::new(endpoint),
            database: config.database.clone(),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.connection_manager.endpoint()
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub async fn connect(&self) -> Result<()> {
        self.connection_manager.connect().await
    }

    pub async fn close(&self) {
        self.connection_manager.close().await
    }

    /// Databases served by the server
    pub async fn list_dbs(&self) -> Result<Vec<String>> {
        let result = self.connection_manager.call("list_dbs", json!([])).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Fail unless the configured database is served
    pub async fn verify_database(&self) -> Result<()> {
        let databases = self.list_dbs().await?;
        if databases.iter().any(|db| *db == self.database) {
            Ok(())
        } else {
            Err(ExporterError::Ovsdb(format!(
                "database {} not found (server has: {})",
                self.database,
                databases.join(", ")
            )))
        }
    }

    /// Liveness round trip
    pub async fn echo(&self) -> Result<()> {
        self.connection_manager.call("echo", json!([])).await?;
        Ok(())
    }

    /// Select all rows of the `Interface` table
    pub async fn select_interfaces(&self) -> Result<Vec<InterfaceRow>> {
        let select = SelectOperation::all(INTERFACE_TABLE, &INTERFACE_COLUMNS);
        let params = json!([self.database, select]);
        let result = self.connection_manager.call("transact", params).await?;

        let mut operations: Vec<InterfaceSelectResult> = serde_json::from_value(result)?;
        if operations.is_empty() {
            return Err(ExporterError::Ovsdb(
                "transact returned no operation results".to_string(),
            ));
        }

        let select = operations.swap_remove(0);
        if let Some(error) = select.error {
            let details = select.details.unwrap_or_default();
            return Err(ExporterError::Ovsdb(format!(
                "select on {} failed: {} {}",
                INTERFACE_TABLE, error, details
            )));
        }

        debug!("Selected {} interface rows", select.rows.len());
        Ok(select.rows)
    }
}

impl InterfaceSource for OvsdbClient {
    async fn list_interfaces(&self) -> Result<Vec<InterfaceRecord>> {
        let rows = self.select_interfaces().await?;
        Ok(rows.into_iter().map(InterfaceRecord::from).collect())
    }
}

