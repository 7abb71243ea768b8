//! Webhook alert channel
//!
//! Posts alerts to an incoming-webhook URL (Slack compatible).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Alert, AlertChannel, ChannelError, ChannelResult, Delivery};
use crate::utils::truncate_text;

/// Webhook channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Extra attempts after the first failed one
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// First backoff delay, doubled on every further retry
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    1000
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.backoff_ms = backoff_ms;
        self
    }

    pub fn validate(&self) -> ChannelResult<()> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| ChannelError::InvalidConfig(format!("webhook url '{}': {e}", self.url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ChannelError::InvalidConfig(format!(
                "webhook url must be http(s), got '{}'",
                parsed.scheme()
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ChannelError::InvalidConfig(
                "webhook timeout must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Delay before retry number `retry` (1-based)
    fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64 << (retry.saturating_sub(1)).min(16);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

/// Webhook alert channel
///
/// # Payload Format
///
/// ```json
/// { "text": "[index]_[scan]_msg: barcode JVGL0001 rejected: unknown_barcode" }
/// ```
pub struct WebhookChannel {
    config: WebhookConfig,
    client: Client,
}

impl WebhookChannel {
    pub fn new(config: WebhookConfig) -> ChannelResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Channel with default timeout and retry policy
    pub fn from_url(url: impl Into<String>) -> ChannelResult<Self> {
        Self::new(WebhookConfig::new(url))
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn payload(alert: &Alert) -> serde_json::Value {
        serde_json::json!({ "text": alert.message })
    }

    async fn post_once(&self, payload: &serde_json::Value) -> ChannelResult<()> {
        let response = self.client.post(&self.config.url).json(payload).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ChannelError::Status {
            status: status.as_u16(),
            body: truncate_text(&body, 200),
        })
    }

    async fn post_with_retry(&self, payload: &serde_json::Value) -> Delivery {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let err = match self.post_once(payload).await {
                Ok(()) => return Delivery::Delivered { attempts },
                Err(e) => e,
            };

            if err.is_permanent() || attempts > self.config.max_retries {
                return Delivery::Dropped {
                    attempts,
                    reason: err.to_string(),
                };
            }

            let delay = self.config.backoff(attempts);
            tracing::debug!(attempt = attempts, ?delay, error = %err, "retrying webhook");
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl AlertChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, alert: &Alert) -> Delivery {
        let delivery = self.post_with_retry(&Self::payload(alert)).await;
        match &delivery {
            Delivery::Delivered { attempts } => {
                tracing::debug!(url = %self.config.url, attempts, "alert delivered");
            }
            Delivery::Dropped { attempts, reason } => {
                tracing::error!(url = %self.config.url, attempts, "alert dropped: {reason}");
            }
        }
        delivery
    }
}
