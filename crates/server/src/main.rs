//! sworker server entry point.
//!
//! Boots the offline cache worker for the configured origin and exposes it as
//! an MCP server on stdio transport. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use sworker_client::{FetchConfig, HttpNetwork};
use sworker_core::{AppConfig, CacheDb, Registration};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        origin = %config.origin,
        version = %config.cache_version,
        db = %config.db_path.display(),
        "Starting sworker server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network = HttpNetwork::new(FetchConfig::from_app(&config)?)?;
    let registration = Arc::new(Registration::new(db, Arc::new(network)));

    match registration.register(config.generation(None)?, config.skip_waiting).await {
        Ok(report) => tracing::info!(worker = report.worker.id, state = %report.worker.state, "boot install complete"),
        Err(e) => tracing::error!(error = %e, "boot install failed; serving passthrough"),
    }

    let handler = handler::WorkerServer::new(registration, config);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
