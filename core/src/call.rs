//! One-shot call lifecycle: cancellation handle, terminal states and the race
//! between completion, deadline and cancellation.
//!
//! # Design
//! A call is `Pending` until exactly one of three futures resolves: the
//! request itself, the deadline, or the caller's cancel handle. `race` polls
//! them with `tokio::select!`, so the winner's value is returned and the
//! losers are dropped. Dropping the request future aborts the underlying
//! connection, which is what makes cancellation leak-free.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::RewriteError;

/// Lifecycle state of a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Pending,
    Succeeded,
    TimedOut,
    ServiceRejected,
    TransportFailed,
    DecodeFailed,
    Cancelled,
}

impl CallState {
    /// State of a call that resolved with `result`.
    pub fn of<T>(result: &Result<T, RewriteError>) -> Self {
        match result {
            Ok(_) => CallState::Succeeded,
            Err(e) => e.state(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, CallState::Pending)
    }
}

/// Caller-side handle for cancelling an in-flight call.
///
/// Clones share the same signal, so one clone can be passed to the call and
/// another kept by whoever decides to abort it.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent; has no effect on calls that have
    /// already resolved.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

impl From<CancellationToken> for CancelHandle {
    fn from(token: CancellationToken) -> Self {
        Self { token }
    }
}

/// Drive `call` to a single terminal outcome.
///
/// A handle that is already cancelled wins before `call` is polled, so no
/// request is ever sent for it.
pub(crate) async fn race<T, F>(call: F, timeout: Duration, cancel: &CancelHandle) -> Result<T, RewriteError>
where
    F: Future<Output = Result<T, RewriteError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RewriteError::Cancelled),
        result = call => result,
        _ = tokio::time::sleep(timeout) => Err(RewriteError::Timeout { after: timeout }),
    }
}
