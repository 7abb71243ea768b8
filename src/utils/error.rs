//! Error types for the remote clients
//!
//! The three families mirror how a remote call can go wrong:
//! the transport never delivered a usable answer, the remote side refused
//! the request in a well-formed reply, or the reply had an unexpected shape.

use thiserror::Error;

/// Failures reaching a remote endpoint
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status without a recognisable rejection body
    #[error("HTTP {status} from {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Request timeout
    #[error("Request to {0} timed out")]
    Timeout(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    /// Classify a reqwest error, separating timeouts from other failures
    pub fn from_reqwest(endpoint: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(endpoint.to_string())
        } else {
            Self::Http(err)
        }
    }
}

/// Well-formed responses in which the remote system refused the request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionError {
    /// Carrier refused the credentials
    #[error("login rejected: {key}")]
    Login { key: String },

    /// Carrier refused a barcode (unknown, duplicate, already handed in)
    #[error("barcode {barcode} rejected: {key}")]
    Scan { barcode: String, key: String },

    /// Carrier refused the hand-in batch
    #[error("hand-in of {parcels} parcels rejected: {key}")]
    HandIn { parcels: usize, key: String },
}

impl RejectionError {
    /// The carrier's error indicator value
    pub fn key(&self) -> &str {
        match self {
            Self::Login { key } | Self::Scan { key, .. } | Self::HandIn { key, .. } => key,
        }
    }
}

/// Responses whose payload shape does not match what the caller expects
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Body could not be decoded as JSON
    #[error("malformed JSON from {endpoint}: {source}")]
    MalformedJson {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// Login succeeded but no anti-forgery token cookie came back
    #[error("no XSRF-TOKEN cookie in login response")]
    MissingToken,

    /// A shipment arrived without a tracking code
    #[error("shipment {shipment} has no track_and_trace code")]
    MissingTrackingCode { shipment: String },

    /// Operation produced nothing where a value was required
    #[error("result is empty")]
    EmptyResult,
}
