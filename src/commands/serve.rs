use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use handin::logging::LogSink;
use handin::trigger::router;

use super::{build_runner, build_sink, init_metrics, load_config};

/// Serve the HTTP trigger until Ctrl+C
pub async fn serve(config: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = load_config(config.as_deref())?;
    init_metrics();

    let sink = build_sink(&config)?;
    let runner = Arc::new(build_runner(&config, sink.clone())?);

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let bind_address = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;

    println!("Hand-in trigger listening on http://{bind_address}");
    println!();
    println!("Endpoints:");
    println!("  GET|POST /                 - Run once, plain-text result");
    println!("  GET      /run?format=json  - Run once, JSON report");
    println!("  GET      /health           - Health check");
    println!("  GET      /metrics          - Prometheus metrics endpoint");
    println!();
    println!("Press Ctrl+C to stop.\n");

    axum::serve(listener, router(runner))
        .with_graceful_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                }
                Err(e) => {
                    tracing::error!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        })
        .await
        .context("HTTP trigger failed")?;

    sink.flush().await;

    println!("Hand-in trigger stopped.");
    Ok(())
}
