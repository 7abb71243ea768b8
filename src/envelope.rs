//! Uniform result envelopes around fallible calls
//!
//! [`normalize`] runs an operation and folds its outcome into an
//! [`Envelope`], so callers branch on a tag instead of on error types:
//!
//! - `Success(value)` - the call produced data
//! - `Empty` - the call succeeded but produced nothing (`None`, `[]`, `""`)
//! - `Failure(detail)` - the call failed; exactly one error-severity log
//!   event has been emitted for it
//!
//! `Empty` never travels through the failure channel. Callers that need a
//! value can still collapse it into a failure with [`Envelope::require`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

use crate::error::{Error, ErrorCategory, HandinErrorTrait, ProtocolError};
use crate::logging::{LogSink, Severity};

/// Identity of a normalized call, reported on failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// Component owning the call (`dhl`, `channeldock`, ...)
    pub source: String,
    /// Function identity
    pub operation: String,
    /// Rendered arguments, secrets excluded
    pub arguments: String,
}

impl CallSite {
    pub fn new(
        source: impl Into<String>,
        operation: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            operation: operation.into(),
            arguments: arguments.into(),
        }
    }
}

/// Why a normalized call failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub category: ErrorCategory,
    pub operation: String,
    pub arguments: String,
}

impl ErrorDetail {
    /// Detail for a failure of `call`
    pub fn at(call: &CallSite, category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category,
            operation: call.operation.clone(),
            arguments: call.arguments.clone(),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (at [{}] with args: {})",
            self.message, self.operation, self.arguments
        )
    }
}

impl std::error::Error for ErrorDetail {}

/// Tagged outcome of a fallible call
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Success(T),
    Empty,
    Failure(ErrorDetail),
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// The value, if any
    pub fn value(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Map the success value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        match self {
            Self::Success(value) => Envelope::Success(f(value)),
            Self::Empty => Envelope::Empty,
            Self::Failure(detail) => Envelope::Failure(detail),
        }
    }

    /// Collapse `Empty` into a failure for callers that need a value
    pub fn require(self, operation: &str) -> Result<T, ErrorDetail> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Empty => {
                let err = Error::from(ProtocolError::EmptyResult);
                Err(ErrorDetail {
                    message: ProtocolError::EmptyResult.to_string(),
                    category: err.category(),
                    operation: operation.to_string(),
                    arguments: String::new(),
                })
            }
            Self::Failure(detail) => Err(detail),
        }
    }
}

/// Decides whether a successful value counts as "nothing"
pub trait Emptiness {
    fn is_empty_result(&self) -> bool;
}

impl<T> Emptiness for Vec<T> {
    fn is_empty_result(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Emptiness for Option<T> {
    fn is_empty_result(&self) -> bool {
        self.is_none()
    }
}

impl Emptiness for String {
    fn is_empty_result(&self) -> bool {
        self.is_empty()
    }
}

impl Emptiness for serde_json::Value {
    fn is_empty_result(&self) -> bool {
        match self {
            serde_json::Value::Null => true,
            serde_json::Value::Array(items) => items.is_empty(),
            serde_json::Value::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

fn fold<T, E>(sink: &dyn LogSink, call: &CallSite, result: Result<T, E>) -> Envelope<T>
where
    T: Emptiness,
    E: Into<Error>,
{
    match result {
        Ok(value) if value.is_empty_result() => {
            tracing::debug!(
                source = %call.source,
                operation = %call.operation,
                "call returned an empty result"
            );
            Envelope::Empty
        }
        Ok(value) => Envelope::Success(value),
        Err(e) => {
            let err: Error = e.into();
            let detail = ErrorDetail::at(call, err.category(), err.to_string());
            sink.record(&call.source, &call.operation, &detail.to_string(), Severity::Error);
            Envelope::Failure(detail)
        }
    }
}

/// Await `operation` and normalize its outcome
///
/// No retries happen here.
pub async fn normalize<T, E, Fut>(sink: &dyn LogSink, call: CallSite, operation: Fut) -> Envelope<T>
where
    T: Emptiness,
    E: Into<Error>,
    Fut: Future<Output = Result<T, E>>,
{
    let result = operation.await;
    fold(sink, &call, result)
}

/// Synchronous counterpart of [`normalize`]
pub fn normalize_sync<T, E, F>(sink: &dyn LogSink, call: CallSite, operation: F) -> Envelope<T>
where
    T: Emptiness,
    E: Into<Error>,
    F: FnOnce() -> Result<T, E>,
{
    fold(sink, &call, operation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::logging::MemorySink;

    fn call() -> CallSite {
        CallSite::new("channeldock", "fetch_shipments", "seller_id=3477")
    }

    #[tokio::test]
    async fn test_success_passes_value() {
        let sink = MemorySink::new();
        let envelope = normalize(&sink, call(), async { Ok::<_, Error>(vec![1, 2, 3]) }).await;

        assert_eq!(envelope, Envelope::Success(vec![1, 2, 3]));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_empty_is_not_a_failure() {
        let sink = MemorySink::new();
        let envelope: Envelope<Vec<u8>> =
            normalize(&sink, call(), async { Ok::<_, Error>(Vec::new()) }).await;

        assert!(envelope.is_empty());
        assert!(!envelope.is_failure());
        assert!(sink.with_severity(Severity::Error).is_empty());
    }

    #[tokio::test]
    async fn test_failure_logs_exactly_once() {
        let sink = MemorySink::new();
        let envelope: Envelope<Vec<u8>> =
            normalize(&sink, call(), async { Err(Error::other("connection reset")) }).await;

        let Envelope::Failure(detail) = envelope else {
            panic!("expected failure");
        };
        assert_eq!(detail.message, "connection reset");
        assert_eq!(detail.category, ErrorCategory::Other);
        assert_eq!(detail.operation, "fetch_shipments");
        assert_eq!(detail.arguments, "seller_id=3477");

        let errors = sink.with_severity(Severity::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(sink.len(), 1);
        assert!(errors[0].message.contains("connection reset"));
    }

    #[test]
    fn test_sync_variant() {
        let sink = MemorySink::new();

        let ok = normalize_sync(&sink, call(), || Ok::<_, Error>("abc".to_string()));
        assert_eq!(ok.value(), Some("abc".to_string()));

        let empty = normalize_sync(&sink, call(), || Ok::<_, Error>(None::<u8>));
        assert!(empty.is_empty());

        let failed: Envelope<String> = normalize_sync(&sink, call(), || {
            Err(TransportError::Timeout("shipment".to_string()))
        });
        let Envelope::Failure(detail) = failed else {
            panic!("expected failure");
        };
        assert_eq!(detail.category, ErrorCategory::Transport);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_require_collapses_empty() {
        let empty: Envelope<Vec<u8>> = Envelope::Empty;
        let err = empty.require("login").unwrap_err();
        assert_eq!(err.message, "result is empty");
        assert_eq!(err.category, ErrorCategory::Protocol);
        assert_eq!(err.operation, "login");

        assert_eq!(Envelope::Success(5).require("x"), Ok(5));
    }

    #[test]
    fn test_json_emptiness() {
        assert!(serde_json::Value::Null.is_empty_result());
        assert!(serde_json::json!([]).is_empty_result());
        assert!(!serde_json::json!({}).is_empty_result());
        assert!(!serde_json::json!({"valid": true}).is_empty_result());
    }

    #[test]
    fn test_map() {
        let doubled = Envelope::Success(21).map(|v| v * 2);
        assert_eq!(doubled, Envelope::Success(42));

        let empty: Envelope<i32> = Envelope::Empty;
        assert!(empty.map(|v| v * 2).is_empty());
    }
}
