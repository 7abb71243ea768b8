//! Command handlers for the `handin` binary

pub mod run;
pub mod schedule;
pub mod serve;

pub use run::{run, RunParams};
pub use schedule::schedule;
pub use serve::serve;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use handin::carrier::DhlClient;
use handin::channeldock::ChannelDockClient;
use handin::config::Config;
use handin::logging::{LogForwarder, SharedSink, TracingSink};
use handin::notifications::{WebhookChannel, WebhookConfig};
use handin::trigger::Runner;
use handin::utils::mask_secret;
use handin::workflow::HandInWorkflow;

/// Load and validate configuration, warning about unset secrets
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = Config::load(path)?;

    let missing = config.missing_secrets();
    if !missing.is_empty() {
        tracing::warn!(missing = ?missing, "secrets not configured, remote calls will be refused");
    }

    tracing::debug!(
        sellers = ?config.workflow.seller_ids,
        channeldock_key = %mask_secret(&config.channeldock.api_key),
        carrier_email = %config.carrier.email,
        "configuration loaded"
    );
    Ok(config)
}

/// Production log sink: tracing, optional alert webhook, optional forwarding
pub fn build_sink(config: &Config) -> Result<SharedSink> {
    let mut sink = TracingSink::new(config.logging.mode);

    if let Some(url) = config.alerts.webhook_url.as_deref().filter(|u| !u.is_empty()) {
        let channel = WebhookChannel::new(
            WebhookConfig::new(url).with_timeout(config.http.request_timeout_secs),
        )
        .context("Invalid alert webhook")?;
        sink = sink.with_alerts(Arc::new(channel));
    }

    if let Some(url) = config.alerts.log_forward_url.as_deref().filter(|u| !u.is_empty()) {
        let forwarder =
            LogForwarder::new(url, config.request_timeout()).context("Invalid log forwarder")?;
        sink = sink.with_forwarder(forwarder);
    }

    Ok(Arc::new(sink))
}

/// Wire clients and workflow behind a run gate
pub fn build_runner(config: &Config, sink: SharedSink) -> Result<Runner> {
    let source = ChannelDockClient::from_config(config, sink.clone())
        .context("Failed to create ChannelDock client")?;
    let carrier =
        DhlClient::from_config(config, sink.clone()).context("Failed to create DHL client")?;

    let workflow = HandInWorkflow::from_config(config, Arc::new(source), Arc::new(carrier), sink);
    Ok(Runner::new(workflow))
}

/// Register metrics; the binary keeps working without them
pub fn init_metrics() {
    if let Err(e) = handin::metrics::init_metrics() {
        tracing::warn!("Metrics initialization failed: {e}");
    }
}
