//! # Errors
//!
//! Error taxonomy shared by every resource kind.
//!
//! - [`ApiError`] is what a Remote API Client returns. It carries the remote
//!   message verbatim so not-found patterns can be matched against it.
//! - [`ResourceError`] is what a lifecycle operation returns. Each variant maps
//!   onto one of the error classes the engine distinguishes: configuration
//!   problems, hard remote failures, decode failures, convergence timeouts and
//!   cancellation.

use crate::client::Capability;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Error returned by a Remote API Client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The remote answered with a non-success status
    #[error("{status} {message}")]
    Status { status: u16, message: String },
    /// The request never produced a response
    #[error("transport error: {0}")]
    Transport(String),
    /// The response could not be decoded into a remote object
    #[error("unexpected response: {0}")]
    Response(String),
}

impl ApiError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Remote message without the status prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Status { message, .. } => message,
            Self::Transport(message) | Self::Response(message) => message,
        }
    }

    /// Whether the rendered error contains `pattern`
    pub fn mentions(&self, pattern: &str) -> bool {
        self.to_string().contains(pattern)
    }
}

/// Lifecycle operation an error or metric belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Import => "import",
        }
    }

    /// Present participle used in diagnostic summaries
    pub fn verb(self) -> &'static str {
        match self {
            Self::Create => "creating",
            Self::Read => "reading",
            Self::Update => "updating",
            Self::Delete => "deleting",
            Self::Import => "importing",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a lifecycle operation or data source read
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Desired configuration is unusable; raised before any remote call
    #[error("attribute '{attribute}' {reason}")]
    Configuration { attribute: String, reason: String },

    /// The handler needs a client the provider was not configured for
    #[error("{capability} client is not available: {reason}")]
    MissingCapability {
        capability: Capability,
        reason: String,
    },

    #[error("invalid import identifier '{id}', expected {expected}")]
    InvalidImportId { id: String, expected: &'static str },

    /// The remote rejected a call; the remote message is kept verbatim
    #[error("failed to {operation} {address}: {source}")]
    Remote {
        operation: Operation,
        address: String,
        #[source]
        source: ApiError,
    },

    /// The object vanished where it must exist (after create or update)
    #[error("{address} does not exist after {operation}")]
    Vanished {
        operation: Operation,
        address: String,
    },

    /// A remote field had a shape the model cannot represent
    #[error("unable to decode attribute '{attribute}': {reason}")]
    Decode { attribute: String, reason: String },

    #[error("{}", timeout_message(address, *timeout, last_error.as_ref()))]
    Timeout {
        address: String,
        timeout: Duration,
        last_error: Option<ApiError>,
    },

    #[error("{operation} of {address} was cancelled")]
    Cancelled {
        operation: Operation,
        address: String,
    },
}

fn timeout_message(address: &str, timeout: Duration, last_error: Option<&ApiError>) -> String {
    match last_error {
        Some(err) => format!("{address} did not converge within {timeout:?}: {err}"),
        None => format!("timed out after {timeout:?} waiting for {address} to converge"),
    }
}

impl ResourceError {
    pub fn configuration(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    pub fn decode(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    pub fn remote(operation: Operation, address: impl Into<String>, source: ApiError) -> Self {
        Self::Remote {
            operation,
            address: address.into(),
            source,
        }
    }

    /// Attribute path the error should be attached to, if any
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::Configuration { attribute, .. } | Self::Decode { attribute, .. } => {
                Some(attribute)
            }
            _ => None,
        }
    }

    /// Whether the error was raised before anything was sent to the remote
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::MissingCapability { .. } | Self::InvalidImportId { .. }
        )
    }

    /// Detail text for a diagnostic
    ///
    /// Remote failures surface the remote message verbatim; everything else
    /// uses the rendered error.
    pub fn detail(&self) -> String {
        match self {
            Self::Remote { source, .. } => source.to_string(),
            Self::Decode { .. } => format!(
                "{self}. This is a bug in the provider or an unsupported remote API version."
            ),
            _ => self.to_string(),
        }
    }
}
