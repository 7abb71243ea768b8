use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(
    name = "handin",
    version,
    about = "Hands in today's ChannelDock shipments at DHL eCommerce",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML config file (environment variables when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the hand-in workflow once for every configured seller
    Run {
        /// Print the run report as JSON
        #[arg(long, default_value = "false")]
        json: bool,

        /// Print every event logged during the run
        #[arg(long, default_value = "false")]
        journal: bool,
    },

    /// Serve the HTTP trigger
    Serve {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run at the configured local times
    Schedule {
        /// Also run once right away
        #[arg(long, default_value = "false")]
        run_on_startup: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    setup_tracing(&cli.log_format, cli.verbose)?;

    tracing::info!("handin starting");

    match cli.command {
        Commands::Run { json, journal } => {
            tracing::info!(json = %json, journal = %journal, "Starting run command");
            commands::run(commands::RunParams {
                config: cli.config,
                json,
                journal,
            })
            .await?;
        }

        Commands::Serve { host, port } => {
            tracing::info!(host = ?host, port = ?port, "Starting serve command");
            commands::serve(cli.config, host, port).await?;
        }

        Commands::Schedule { run_on_startup } => {
            tracing::info!(run_on_startup = %run_on_startup, "Starting schedule command");
            commands::schedule(cli.config, run_on_startup).await?;
        }
    }

    tracing::info!("handin completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("handin=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("handin=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        "text" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        other => anyhow::bail!("Unknown log format '{other}', expected text or json"),
    }

    Ok(())
}
