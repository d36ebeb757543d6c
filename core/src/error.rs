//! Error taxonomy for the rewrite client.
//!
//! # Design
//! Every call ends in exactly one terminal state. Failures are classified by
//! *where* they happened: before anything was sent (`InvalidRequest`), on the
//! wire (`Transport`), in the race against the deadline or the caller
//! (`Timeout`, `Cancelled`), in the service's verdict (`Service`) or while
//! decoding a successful reply (`Decode`). Nothing is retried or swallowed;
//! the caller decides what each variant means to a user.

use std::time::Duration;

use thiserror::Error;

use crate::call::CallState;

/// Errors returned by `RewriteClient` operations.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// The connection could not be established or was dropped mid-flight.
    #[error("transport error: {0}")]
    Transport(String),

    /// No reply arrived within the configured window.
    #[error("no reply within {}ms", .after.as_millis())]
    Timeout { after: Duration },

    /// The service replied with a non-2xx status.
    #[error("service returned HTTP {status}: {body}")]
    Service { status: u16, body: String },

    /// A 2xx reply arrived but its body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The caller's cancel handle fired before the call resolved.
    #[error("call cancelled")]
    Cancelled,

    /// The request could not be built locally.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RewriteError {
    /// Terminal state of a call that failed with this error.
    pub fn state(&self) -> CallState {
        match self {
            RewriteError::Transport(_) | RewriteError::InvalidRequest(_) => {
                CallState::TransportFailed
            }
            RewriteError::Timeout { .. } => CallState::TimedOut,
            RewriteError::Service { .. } => CallState::ServiceRejected,
            RewriteError::Decode(_) => CallState::DecodeFailed,
            RewriteError::Cancelled => CallState::Cancelled,
        }
    }

    /// HTTP status of a service rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            RewriteError::Service { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw body of a service rejection.
    pub fn body(&self) -> Option<&str> {
        match self {
            RewriteError::Service { body, .. } => Some(body),
            _ => None,
        }
    }

    /// The `error` message from a `{"success": false, "error": "..."}`
    /// envelope, when the rejection body carries one.
    pub fn service_message(&self) -> Option<String> {
        let body = self.body()?;
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        value.get("error")?.as_str().map(str::to_string)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RewriteError::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RewriteError::Cancelled)
    }
}

impl From<reqwest::Error> for RewriteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            RewriteError::InvalidRequest(e.to_string())
        } else {
            RewriteError::Transport(e.to_string())
        }
    }
}
