//! Completion handles for queued orchestrator operations.

use crate::orchestrator::{OrchestratorError, Result};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Resolves once the worker has run the operation.
///
/// Dropping the handle does not cancel the operation; it still runs in turn
/// and its result is discarded.
#[must_use = "the operation runs regardless, but its outcome is only visible through this handle"]
#[derive(Debug)]
pub struct PendingOperation<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> PendingOperation<T> {
    pub(crate) fn new(rx: oneshot::Receiver<Result<T>>) -> Self {
        Self { rx }
    }
}

impl<T> Future for PendingOperation<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(OrchestratorError::WorkerStopped)))
    }
}
