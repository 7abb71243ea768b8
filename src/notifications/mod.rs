//! Operator alerting
//!
//! Error-severity log events are pushed to an alert channel so that a
//! failed hand-in does not sit unnoticed until someone reads the logs.
//!
//! ```text
//!   LogSink (TracingSink)
//!          │  severity 2/3
//!          ▼
//!   ┌───────────────┐
//!   │ AlertChannel  │──► WebhookChannel ──► POST {"text": ...}
//!   └───────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use handin::notifications::{Alert, AlertChannel, WebhookChannel};
//! use handin::logging::Severity;
//!
//! let channel = WebhookChannel::from_url("https://hooks.example.com/services/T0/B0/x")?;
//! let alert = Alert::new(Severity::Error, "[index]_[scan]_msg: barcode rejected");
//! let delivery = channel.send(&alert).await;
//! assert!(delivery.is_delivered());
//! ```

mod webhook;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::logging::Severity;

pub use webhook::{WebhookChannel, WebhookConfig};

/// Why an endpoint did not accept a payload
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("delivery failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint answered HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid endpoint configuration: {0}")]
    InvalidConfig(String),
}

impl ChannelError {
    /// Retrying cannot help: the endpoint refused the payload or is misconfigured
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::Status { status, .. } => (400..500).contains(status),
            Self::InvalidConfig(_) => true,
            Self::Transport(_) => false,
        }
    }
}

pub type ChannelResult<T> = Result<T, ChannelError>;

/// Outcome of pushing one alert through a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered { attempts: u32 },
    Dropped { attempts: u32, reason: String },
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    /// Requests made, including retries
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Delivered { attempts } | Self::Dropped { attempts, .. } => *attempts,
        }
    }
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered { attempts } => write!(f, "delivered after {attempts} attempt(s)"),
            Self::Dropped { attempts, reason } => {
                write!(f, "dropped after {attempts} attempt(s): {reason}")
            }
        }
    }
}

/// Destination for operator alerts
///
/// Channels own their retry policy, so `send` reports the final outcome
/// instead of an error.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, alert: &Alert) -> Delivery;
}

/// An alert instance with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert identifier
    pub id: String,
    /// Severity of the log event that raised the alert
    pub severity: Severity,
    /// Alert message (the event's short form)
    pub message: String,
    /// Additional context and metadata
    pub metadata: HashMap<String, String>,
    /// When the alert was created
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Create a new alert
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            severity,
            message: message.into(),
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Add metadata to the alert
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
