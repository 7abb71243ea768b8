//! handin - ChannelDock to DHL eCommerce hand-in bridge
//!
//! Once per trigger, lists every configured seller's shipments due today,
//! validates each tracking barcode with the carrier portal and submits the
//! validated barcodes as one hand-in batch.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`envelope`] - Three-state result envelopes around fallible calls
//! - [`channeldock`] - Order-management client with pagination
//! - [`carrier`] - Carrier portal client (login, scan, hand-in)
//! - [`workflow`] - Per-seller state machine and run reports
//! - [`trigger`] - Scheduled and HTTP triggers
//! - [`logging`] - Log sink with severities, alerts and forwarding
//! - [`notifications`] - Alert channels (webhook)
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`metrics`] - Prometheus counters
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use handin::carrier::DhlClient;
//! use handin::channeldock::ChannelDockClient;
//! use handin::config::Config;
//! use handin::logging::{LogMode, SharedSink, TracingSink};
//! use handin::workflow::HandInWorkflow;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let sink: SharedSink = Arc::new(TracingSink::new(LogMode::Verbose));
//!     let source = ChannelDockClient::from_config(&config, sink.clone())?;
//!     let carrier = DhlClient::from_config(&config, sink.clone())?;
//!
//!     let workflow =
//!         HandInWorkflow::from_config(&config, Arc::new(source), Arc::new(carrier), sink);
//!     println!("{}", workflow.run().await.summary()?);
//!     Ok(())
//! }
//! ```

pub mod carrier;
pub mod channeldock;
pub mod config;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod notifications;
pub mod trigger;
pub mod utils;
pub mod workflow;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::carrier::{CarrierPortal, Credentials, DhlClient, SessionHandle};
    pub use crate::channeldock::{ChannelDockClient, ShipmentSource};
    pub use crate::config::Config;
    pub use crate::envelope::{normalize, Envelope, ErrorDetail};
    pub use crate::error::{Error, ErrorCategory, HandinErrorTrait, Result};
    pub use crate::logging::{LogSink, Severity, SharedSink};
    pub use crate::models::{DateWindow, SellerId, ShipmentRecord};
    pub use crate::workflow::{HandInWorkflow, RunReport, SellerOutcome};
}

// Direct re-exports for convenience
pub use envelope::Envelope;
pub use models::{DateWindow, ShipmentRecord};
