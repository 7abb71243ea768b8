//! Unified error handling for the handin crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`HandinErrorTrait`] - Category lookup used when folding errors into envelopes
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use handin::error::{Error, ErrorCategory, HandinErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     match err.category() {
//!         ErrorCategory::Rejection => println!("Carrier refused: {err}"),
//!         _ => eprintln!("Fatal error: {}", err),
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::utils::error::{ProtocolError, RejectionError, TransportError};

/// Common trait for all handin error types
pub trait HandinErrorTrait: std::error::Error {
    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Network/HTTP failures reaching a remote endpoint
    Transport,
    /// Well-formed refusals from the remote system
    Rejection,
    /// Malformed or unexpected payload shapes
    Protocol,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Rejection => "rejection",
            Self::Protocol => "protocol",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the handin crate
#[derive(Error, Debug)]
pub enum Error {
    /// Transport faults
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Logical rejections
    #[error("Rejected: {0}")]
    Rejection(#[from] RejectionError),

    /// Unexpected payloads
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl HandinErrorTrait for Error {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) => ErrorCategory::Transport,
            Self::Rejection(_) => ErrorCategory::Rejection,
            Self::Protocol(_) => ErrorCategory::Protocol,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other(_) => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other(context.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
