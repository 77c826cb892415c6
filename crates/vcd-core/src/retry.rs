//! Bounded retry for allow-listed flaky reads.
//!
//! Some vCD read paths intermittently answer with a spurious server error
//! under load and succeed when asked again. Retry is opted into per operation
//! kind through a [`RetryAllowList`]; anything not on the list runs exactly
//! once and every error outside a policy's classifier surfaces immediately.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default total attempts for a transient retry policy.
pub const DEFAULT_TRANSIENT_ATTEMPTS: u32 = 4;

/// Default fixed delay between attempts, in milliseconds.
pub const DEFAULT_TRANSIENT_BACKOFF_MS: u64 = 200;

/// Operation kind for reading a single edge gateway by HREF.
pub const EDGE_GATEWAY_READ: &str = "edge_gateway_read";

/// Decides whether an error is worth another attempt.
pub type TransientClassifier = fn(&Error) -> bool;

/// Retry policy for one operation kind: fixed backoff, bounded attempts.
#[derive(Debug, Clone, Copy)]
pub struct TransientRetry {
    kind: &'static str,
    max_attempts: u32,
    backoff: Duration,
    classifier: TransientClassifier,
}

impl TransientRetry {
    /// Create a policy with the default attempts and backoff.
    #[must_use]
    pub const fn new(kind: &'static str, classifier: TransientClassifier) -> Self {
        Self {
            kind,
            max_attempts: DEFAULT_TRANSIENT_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_TRANSIENT_BACKOFF_MS),
            classifier,
        }
    }

    /// Policy for the flaky edge gateway read: retries server-side failures.
    #[must_use]
    pub const fn edge_gateway_read() -> Self {
        Self::new(EDGE_GATEWAY_READ, Error::is_server_side)
    }

    /// Set the total number of attempts (clamped to at least one).
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = if attempts == 0 { 1 } else { attempts };
        self
    }

    /// Set the fixed delay between attempts.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Operation kind this policy covers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    /// Total attempts allowed.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay between attempts.
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Returns true if the policy would retry this error.
    #[must_use]
    pub fn is_transient(&self, error: &Error) -> bool {
        (self.classifier)(error)
    }

    /// Run `operation`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns the first non-transient error, or the last transient error once
    /// the attempts are exhausted.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && self.is_transient(&err) => {
                    debug!(
                        kind = self.kind,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(err) => {
                    if attempt > 1 && self.is_transient(&err) {
                        warn!(kind = self.kind, attempts = attempt, error = %err, "retries exhausted");
                    }
                    return Err(err);
                }
            }
        }
    }
}

/// The set of operation kinds allowed to retry.
#[derive(Debug, Clone)]
pub struct RetryAllowList {
    policies: HashMap<&'static str, TransientRetry>,
}

impl RetryAllowList {
    /// An allow-list with no entries: nothing retries.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            policies: HashMap::new(),
        }
    }

    /// Add or replace the policy for its operation kind.
    #[must_use]
    pub fn with_policy(mut self, policy: TransientRetry) -> Self {
        self.policies.insert(policy.kind(), policy);
        self
    }

    /// Policy registered for `kind`, if any.
    #[must_use]
    pub fn policy(&self, kind: &str) -> Option<&TransientRetry> {
        self.policies.get(kind)
    }

    /// Run `operation` under the policy for `kind`, or exactly once if `kind`
    /// is not allow-listed.
    ///
    /// # Errors
    ///
    /// Propagates the operation's error as described on [`TransientRetry::run`].
    pub async fn run<T, F, Fut>(&self, kind: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.policy(kind) {
            Some(policy) => policy.run(operation).await,
            None => operation().await,
        }
    }
}

impl Default for RetryAllowList {
    fn default() -> Self {
        Self::empty().with_policy(TransientRetry::edge_gateway_read())
    }
}
