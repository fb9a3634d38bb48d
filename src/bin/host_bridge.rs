//! Headless host bridge binary for stdin/stdout JSON communication.
//!
//! This binary reads `CommandEnvelope` messages as newline-delimited JSON
//! from stdin, dispatches them through the host command channel, and writes
//! `ResponseEnvelope` and `EventEnvelope` messages to stdout.
//!
//! The config file is `$QUORUM_CONFIG` if set, otherwise the default path;
//! a missing file means defaults. All tracing/diagnostic output goes to
//! stderr so that stdout remains a clean JSON protocol channel.

use std::path::PathBuf;
use std::sync::Arc;

use quorum::host::handler::SearchHostHandler;
use quorum::host::stdio::run_stdio_bridge;
use quorum::{QuorumConfig, SearchService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise tracing to stderr only (stdout is reserved for the JSON
    // protocol).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("quorum=info,quorum_search=info")
            }),
        )
        .init();

    let path = std::env::var_os("QUORUM_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(QuorumConfig::default_config_path);
    let config = QuorumConfig::load_or_default(&path)
        .map_err(|e| anyhow::anyhow!("failed to load config {}: {e}", path.display()))?;
    let service = SearchService::from_config(&config)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;

    tracing::info!(config = %path.display(), "quorum-host starting");

    run_stdio_bridge(SearchHostHandler::new(Arc::new(service)))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "quorum-host exited with error");
            anyhow::anyhow!("quorum-host failed: {e}")
        })?;

    tracing::info!("quorum-host shut down cleanly");
    Ok(())
}
