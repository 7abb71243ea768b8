use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use handin::logging::LogSink;
use handin::trigger::{ScheduledTrigger, TickSchedule};

use super::{build_runner, build_sink, init_metrics, load_config};

/// Run the workflow at the configured local times until Ctrl+C
pub async fn schedule(config: Option<PathBuf>, run_on_startup: bool) -> Result<()> {
    let config = load_config(config.as_deref())?;
    init_metrics();

    let ticks = TickSchedule::parse(&config.schedule.times).context("Invalid schedule")?;
    let sink = build_sink(&config)?;
    let runner = Arc::new(build_runner(&config, sink.clone())?);

    let trigger = Arc::new(ScheduledTrigger::new(
        ticks,
        runner,
        run_on_startup || config.schedule.run_on_startup,
    ));

    println!(
        "Scheduled hand-in at {} (local time). Press Ctrl+C to stop.",
        config.schedule.times.join(", ")
    );

    let looping = Arc::clone(&trigger);
    let handle = tokio::spawn(async move { looping.start().await });

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!("Failed to wait for Ctrl+C: {}", e),
    }
    trigger.stop();

    handle.await.context("Scheduler task panicked")?;
    sink.flush().await;
    println!("Scheduler stopped.");
    Ok(())
}
