use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use handin::logging::{LogSink, MemorySink, SharedSink};

use super::{build_runner, build_sink, init_metrics, load_config};

/// Options of a one-shot run
#[derive(Debug, Clone, Default)]
pub struct RunParams {
    pub config: Option<PathBuf>,
    /// Print the report as JSON instead of the summary token
    pub json: bool,
    /// Print every logged event of the run afterwards
    pub journal: bool,
}

/// Run the workflow once and exit non-zero on failure
pub async fn run(params: RunParams) -> Result<()> {
    let config = load_config(params.config.as_deref())?;
    init_metrics();

    let production = build_sink(&config)?;
    let journal = Arc::new(MemorySink::tee(production));
    let sink: SharedSink = journal.clone();

    let runner = build_runner(&config, sink)?;
    let report = runner.run().await;
    // alerts and forwarded lines must land before the process exits
    journal.flush().await;

    if params.journal {
        for event in journal.events() {
            println!("{}", event.long());
        }
    }

    if params.json {
        let rendered =
            serde_json::to_string_pretty(&report).context("Failed to render run report")?;
        println!("{rendered}");
    }

    match report.summary() {
        Ok(token) => {
            if !params.json {
                println!("{token}");
            }
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context("Hand-in run failed")),
    }
}
