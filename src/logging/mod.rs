//! Logging collaborator
//!
//! Every component reports through a [`LogSink`] with the
//! `(source, operation, message, severity)` shape. Sinks decide where an
//! event goes: the tracing subscriber, the alert webhook, a log forwarding
//! endpoint, or an in-memory journal.
//!
//! # Severities
//!
//! | Code | Severity | Tracing level | Alerts |
//! |------|----------|---------------|--------|
//! | 1    | Info     | `info`        | no     |
//! | 2    | Error    | `error`       | yes    |
//! | 3    | Critical | `error`       | yes    |
//! | 4    | Warning  | `warn`        | no     |

mod sinks;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use sinks::{LogForwarder, MemorySink, TracingSink};

/// Severity of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
    Critical,
    Warning,
}

impl Severity {
    /// Numeric code used on the wire by the log forwarding endpoint
    pub fn code(&self) -> u8 {
        match self {
            Self::Info => 1,
            Self::Error => 2,
            Self::Critical => 3,
            Self::Warning => 4,
        }
    }

    /// Parse a numeric severity code; unknown codes fall back to info
    pub fn from_code(code: u8) -> Self {
        match code {
            2 => Self::Error,
            3 => Self::Critical,
            4 => Self::Warning,
            _ => Self::Info,
        }
    }

    /// Whether this severity also raises an external alert
    pub fn is_alerting(&self) -> bool {
        matches!(self, Self::Error | Self::Critical)
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Error => "error",
            Self::Critical => "critical",
            Self::Warning => "warning",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How chatty forwarding is
///
/// Errors are always forwarded; informational events only in `Verbose`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    Quiet,
    #[default]
    Verbose,
}

impl LogMode {
    /// Decide whether an event of `severity` goes to the forwarding endpoint
    pub fn forwards(&self, severity: Severity) -> bool {
        match severity {
            Severity::Error | Severity::Critical => true,
            Severity::Info => *self == Self::Verbose,
            Severity::Warning => false,
        }
    }
}

impl std::str::FromStr for LogMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "0" => Ok(Self::Quiet),
            "verbose" | "1" => Ok(Self::Verbose),
            other => Err(format!("unknown log mode '{other}'")),
        }
    }
}

/// One log event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    /// Component emitting the event (e.g. `dhl`, `channeldock`, `workflow`)
    pub source: String,
    /// Operation inside the component (e.g. `login`, `scan`)
    pub operation: String,
    pub message: String,
    pub severity: Severity,
    pub at: DateTime<Local>,
}

impl LogEvent {
    /// Create a new event stamped with the local clock
    pub fn new(
        source: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            source: source.into(),
            operation: operation.into(),
            message: message.into(),
            severity,
            at: Local::now(),
        }
    }

    /// `[source]_[operation]_msg: message`
    pub fn short(&self) -> String {
        format!("[{}]_[{}]_msg: {}", self.source, self.operation, self.message)
    }

    /// Short form prefixed with a `dd-mm-YYYY_HH:MM:SS` timestamp
    pub fn long(&self) -> String {
        format!("{}_{}", self.at.format("%d-%m-%Y_%H:%M:%S"), self.short())
    }
}

/// Destination for log events
///
/// Emission is fire-and-forget: implementations must not block the caller on
/// network delivery and must not fail. Deliveries still in flight are awaited
/// by [`flush`](LogSink::flush), which the process calls before exiting.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver one event
    fn emit(&self, event: LogEvent);

    /// Build and deliver an event in one call
    fn record(&self, source: &str, operation: &str, message: &str, severity: Severity) {
        self.emit(LogEvent::new(source, operation, message, severity));
    }

    /// Wait for background deliveries started so far
    async fn flush(&self) {}
}

/// Shared handle to a sink
pub type SharedSink = Arc<dyn LogSink>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_codes() {
        for severity in [
            Severity::Info,
            Severity::Error,
            Severity::Critical,
            Severity::Warning,
        ] {
            assert_eq!(Severity::from_code(severity.code()), severity);
        }
        assert_eq!(Severity::from_code(0), Severity::Info);
        assert_eq!(Severity::from_code(9), Severity::Info);
    }

    #[test]
    fn test_alerting_severities() {
        assert!(Severity::Error.is_alerting());
        assert!(Severity::Critical.is_alerting());
        assert!(!Severity::Info.is_alerting());
        assert!(!Severity::Warning.is_alerting());
    }

    #[test]
    fn test_log_mode_forwarding() {
        assert!(LogMode::Quiet.forwards(Severity::Error));
        assert!(LogMode::Quiet.forwards(Severity::Critical));
        assert!(!LogMode::Quiet.forwards(Severity::Info));
        assert!(LogMode::Verbose.forwards(Severity::Info));
        assert!(!LogMode::Verbose.forwards(Severity::Warning));
    }

    #[test]
    fn test_log_mode_parse() {
        assert_eq!("quiet".parse::<LogMode>(), Ok(LogMode::Quiet));
        assert_eq!("1".parse::<LogMode>(), Ok(LogMode::Verbose));
        assert!("loud".parse::<LogMode>().is_err());
    }

    #[test]
    fn test_message_shapes() {
        let event = LogEvent::new("dhl", "login", "invalid_credentials", Severity::Info);
        assert_eq!(event.short(), "[dhl]_[login]_msg: invalid_credentials");

        let long = event.long();
        assert!(long.ends_with("_[dhl]_[login]_msg: invalid_credentials"));
        // dd-mm-YYYY_HH:MM:SS
        assert_eq!(long.find("_[dhl]"), Some(19));
    }
}
