use anyhow::Result;
use clap::Parser;
use ovs_exporter::config::{Config, LogFormat};
use ovs_exporter::server;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/Default.toml")]
    config: String,

    /// Endpoint for OVSDB (overrides config)
    #[arg(long = "ovsdb.endpoint", env = "OVSDB_ENDPOINT")]
    ovsdb_endpoint: Option<String>,

    /// Path under which to expose metrics (overrides config)
    #[arg(long = "web.telemetry-path")]
    metrics_path: Option<String>,

    /// Address on which to expose metrics, as host:port (e.g. ":9272")
    #[arg(long = "web.listen-address", env = "WEB_LISTEN_ADDRESS")]
    listen_address: Option<String>,

    /// Port to listen on for metrics (overrides --web.listen-address)
    #[arg(short, long, env = "EXPORTER_PORT")]
    port: Option<u16>,

    /// Address to bind to (overrides --web.listen-address)
    #[arg(short, long, env = "EXPORTER_ADDR")]
    addr: Option<String>,

    /// Log level, e.g. "info" or "ovs_exporter=debug" (RUST_LOG takes precedence)
    #[arg(long = "log.level")]
    log_level: Option<String>,

    /// Log output format
    #[arg(long = "log.format", value_enum)]
    log_format: Option<LogFormat>,
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(&args.config)?;

    // Override with CLI arguments if provided
    if let Some(endpoint) = args.ovsdb_endpoint {
        config.ovsdb.endpoint = endpoint;
    }
    if let Some(path) = args.metrics_path {
        config.server.metrics_path = path;
    }
    if let Some(address) = args.listen_address {
        config.server.set_listen_address(&address)?;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }

    init_logging(&config.logging.level, config.logging.format);

    info!("Starting ovs_exporter v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!("{}", e);
        std::process::exit(1);
    }

    info!("Configuration loaded successfully");
    info!("OVSDB endpoint: {}", config.ovsdb.endpoint);

    // Start the metrics server
    if let Err(e) = server::start(config).await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
