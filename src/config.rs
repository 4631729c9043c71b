use crate::error::ExporterError;
use crate::ovsdb::Endpoint;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub ovsdb: OvsdbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OvsdbConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_database")]
    pub database: String,
    /// Upper bound on a single snapshot read, per scrape
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_endpoint() -> String {
    "unix:/var/run/openvswitch/db.sock".to_string()
}

fn default_database() -> String {
    "Open_vSwitch".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9272
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for OvsdbConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            database: default_database(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
            metrics_path: default_metrics_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl ServerConfig {
    /// Set `addr` and `port` from a `host:port` listen address
    ///
    /// An empty host (`:9272`) binds all interfaces. IPv6 hosts must be bracketed.
    pub fn set_listen_address(
        &mut self,
        address: &str,
    ) -> std::result::Result<(), ExporterError> {
        let invalid = || {
            ExporterError::Config(format!(
                "invalid listen address (expected host:port): {}",
                address
            ))
        };

        let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
        let port = port.parse::<u16>().map_err(|_| invalid())?;
        if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
            return Err(invalid());
        }

        self.addr = if host.is_empty() {
            default_addr()
        } else {
            host.to_string()
        };
        self.port = port;
        Ok(())
    }
}

impl OvsdbConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("OVS_EXPORTER").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Reject settings that would only fail later, at scrape time
    pub fn validate(&self) -> std::result::Result<(), ExporterError> {
        if !self.server.metrics_path.starts_with('/') {
            return Err(ExporterError::Config(format!(
                "metrics path must start with '/': {}",
                self.server.metrics_path
            )));
        }
        if self.server.metrics_path == "/health" {
            return Err(ExporterError::Config(
                "metrics path /health is reserved for the health check".to_string(),
            ));
        }
        if self.ovsdb.timeout_seconds == 0 {
            return Err(ExporterError::Config(
                "ovsdb.timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.ovsdb.database.is_empty() {
            return Err(ExporterError::Config(
                "ovsdb.database must not be empty".to_string(),
            ));
        }
        self.ovsdb.endpoint.parse::<Endpoint>()?;
        Ok(())
    }
}
