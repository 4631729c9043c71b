//! HTTP Server and Metrics Collection
//!
//! This module implements the Prometheus exporter HTTP server.
//!
//! # Architecture
//!
//! - **HTTP Server**: Axum-based server exposing the metrics path, `/health`, and `/`
//! - **Collection**: Each scrape reads a fresh snapshot; nothing is collected in the
//!   background and nothing is cached between scrapes
//! - **State Management**: One shared, read-only `InterfaceCollector` behind an `Arc`
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page with links to metrics and health (unless metrics are served at `/`)
//! - `GET /metrics` - Prometheus metrics in text format (path configurable)
//! - `GET /health` - Health check (returns 200 if OVSDB answers an echo, 503 otherwise)
//!
//! # Error Handling
//!
//! A failed snapshot read never fails the HTTP request: the scrape is answered with an
//! empty exposition and the error is logged.

use crate::collectors::{CollectionStatus, InterfaceCollector};
use crate::config::Config;
use crate::metrics::{self, Schema};
use crate::ovsdb::OvsdbClient;
use crate::source::InterfaceSource;
use anyhow::Context;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared, read-only state of the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    collector: Arc<InterfaceCollector<OvsdbClient>>,
}

impl AppState {
    pub fn new(config: Config, collector: InterfaceCollector<OvsdbClient>) -> Self {
        Self {
            config: Arc::new(config),
            collector: Arc::new(collector),
        }
    }
}

pub async fn start(config: Config) -> anyhow::Result<()> {
    let schema = Schema::new();
    schema.descs().context("Invalid metric schema")?;

    let client = OvsdbClient::new(&config.ovsdb).context("Error creating OVSDB client")?;
    client
        .connect()
        .await
        .with_context(|| format!("Error connecting to OVSDB at {}", client.endpoint()))?;
    client
        .verify_database()
        .await
        .context("Error checking OVSDB database")?;
    info!(
        "Connected to OVSDB at {} (database {})",
        client.endpoint(),
        client.database()
    );

    let collector = InterfaceCollector::new(schema, client, config.ovsdb.timeout());
    let addr = format!("{}:{}", config.server.addr, config.server.port);
    let metrics_path = config.server.metrics_path.clone();
    let app = router(AppState::new(config, collector));

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Error binding {}", addr))?;

    info!("Metrics server listening on {}", addr);
    info!(
        "Metrics available at http://{}{}",
        addr, metrics_path
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the HTTP routes
///
/// No landing page is mounted when metrics are served at `/`.
pub fn router(state: AppState) -> Router {
    let metrics_path = state.config.server.metrics_path.clone();
    let mut app = Router::new()
        .route(&metrics_path, get(metrics_handler))
        .route("/health", get(health_handler));

    if metrics_path != "/" {
        app = app.route("/", get(root_handler));
    }

    app.with_state(state)
}

/// Run one collection and render it in Prometheus text format
///
/// A failed snapshot yields a valid, empty exposition.
pub async fn scrape<S: InterfaceSource>(
    collector: &InterfaceCollector<S>,
) -> anyhow::Result<String> {
    let (status, samples) = collector.collect_samples().await;
    match status {
        CollectionStatus::Success => debug!("Collected {} samples", samples.len()),
        CollectionStatus::Failed => warn!("Serving empty scrape after snapshot failure"),
    }
    metrics::render(collector.schema(), &samples)
}

async fn root_handler(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        r#"<html>
<head><title>Open vSwitch Exporter</title></head>
<body>
<h1>Open vSwitch Exporter</h1>
<p>Prometheus Exporter for Open vSwitch, version {}</p>
<p><a href="{}">Metrics</a></p>
<p><a href="/health">Health</a></p>
</body>
</html>"#,
        env!("CARGO_PKG_VERSION"),
        state.config.server.metrics_path
    ))
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match scrape(state.collector.as_ref()).await {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let timeout = state.config.ovsdb.timeout();
    match tokio::time::timeout(timeout, state.collector.source().echo()).await {
        Ok(Ok(())) => (StatusCode::OK, "OK"),
        Ok(Err(e)) => {
            warn!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "OVSDB unreachable")
        }
        Err(_) => {
            warn!("Health check timed out after {:?}", timeout);
            (StatusCode::SERVICE_UNAVAILABLE, "OVSDB unreachable")
        }
    }
}
