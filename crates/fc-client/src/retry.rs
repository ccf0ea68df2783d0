//! Transparent retry of transient network failures.

use futures::future::BoxFuture;
use tracing::warn;

use crate::error::Result;
use crate::request::{HttpRequest, HttpResponse};
use crate::sender::HttpSender;

/// Tracks the retry budget of one logical request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    attempt: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            attempt: 0,
        }
    }

    /// Number of retries recorded so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns true if another retry fits in the budget.
    pub fn should_retry(&self) -> bool {
        self.attempt < self.max_retries
    }

    /// Record a retry. Returns false, without recording, once the budget is
    /// used up.
    pub fn record_retry(&mut self) -> bool {
        if !self.should_retry() {
            return false;
        }
        self.attempt += 1;
        true
    }
}

/// Decorator that resends a request immediately when it fails with a
/// connect timeout or a connection reset.
///
/// Any other outcome, including an HTTP error status, is returned unchanged.
/// Once the budget is spent the last transient error is returned.
#[derive(Debug)]
pub struct RetryingSender<S> {
    inner: S,
    max_retries: u32,
}

impl<S: HttpSender> RetryingSender<S> {
    pub fn new(inner: S, max_retries: u32) -> Self {
        Self { inner, max_retries }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: HttpSender> HttpSender for RetryingSender<S> {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>> {
        Box::pin(async move {
            let mut policy = RetryPolicy::new(self.max_retries);
            loop {
                match self.inner.send(request.clone()).await {
                    Err(err) if err.is_transient() && policy.record_retry() => {
                        warn!(
                            attempt = policy.attempt(),
                            url = %request.url,
                            error = %err,
                            "Transient network failure, retrying"
                        );
                    }
                    result => return result,
                }
            }
        })
    }
}
