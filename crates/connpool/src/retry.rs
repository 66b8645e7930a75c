//! Automatic re-execution of operations that hit a broken connection.
//!
//! [`retry`] wraps an arbitrary async operation and reissues it whenever it
//! fails with a classified error. It is orthogonal to
//! [`Pool`](crate::Pool): layered around code that calls
//! [`Pool::acquire`](crate::Pool::acquire), each attempt naturally picks up
//! a fresh connection, because the broken one was discarded when its borrow
//! ended.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::error::Classify;

/// Callback invoked with the operation name and the classified error.
pub type RetryCallback<E> = Arc<dyn Fn(&str, &E) + Send + Sync>;

/// Policy for [`retry`].
///
/// The defaults retry forever with no delay between attempts.
#[derive(Clone)]
pub struct RetryPolicy<E> {
    /// Cap on consecutive classified failures; `None` retries forever.
    pub max_failures: Option<u32>,
    /// Delay between attempts.
    pub interval: Duration,
    classifier: Option<Arc<dyn Fn(&E) -> bool + Send + Sync>>,
    on_retry: Option<RetryCallback<E>>,
    on_max_failures: Option<RetryCallback<E>>,
}

impl<E> Default for RetryPolicy<E> {
    fn default() -> Self {
        Self {
            max_failures: None,
            interval: Duration::ZERO,
            classifier: None,
            on_retry: None,
            on_max_failures: None,
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_failures", &self.max_failures)
            .field("interval", &self.interval)
            .field("classifier", &self.classifier.is_some())
            .field("on_retry", &self.on_retry.is_some())
            .field("on_max_failures", &self.on_max_failures.is_some())
            .finish()
    }
}

impl<E> RetryPolicy<E> {
    /// Create a policy with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of consecutive classified failures.
    ///
    /// Once the counter exceeds `cap`, the last error is returned to the
    /// caller instead of retrying.
    #[must_use]
    pub fn max_failures(mut self, cap: u32) -> Self {
        self.max_failures = Some(cap);
        self
    }

    /// Set the delay between attempts.
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Override the [`Classify`] implementation for this policy.
    #[must_use]
    pub fn classify_with(mut self, f: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.classifier = Some(Arc::new(f));
        self
    }

    /// Invoke `f` on every classified failure, before the retry delay.
    #[must_use]
    pub fn on_retry(mut self, f: impl Fn(&str, &E) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(Arc::new(f));
        self
    }

    /// Invoke `f` once when `max_failures` is exceeded, before the error
    /// is returned.
    #[must_use]
    pub fn on_max_failures(mut self, f: impl Fn(&str, &E) + Send + Sync + 'static) -> Self {
        self.on_max_failures = Some(Arc::new(f));
        self
    }

    fn is_broken(&self, err: &E) -> bool
    where
        E: Classify,
    {
        match &self.classifier {
            Some(classify) => classify(err),
            None => err.is_disconnect(),
        }
    }
}

/// Run `op` until it succeeds or fails in a way that is not classified as
/// a disconnect.
///
/// `name` identifies the operation in log events and callbacks. The failure
/// counter starts at zero on every invocation; no state persists across
/// calls.
///
/// # Errors
///
/// An unclassified error propagates immediately, with no callback and no
/// delay. A classified error is returned once `max_failures` consecutive
/// failures have been exceeded.
pub async fn retry<T, E, F, Fut>(name: &str, policy: &RetryPolicy<E>, mut op: F) -> Result<T, E>
where
    E: Classify + fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut failures: u32 = 0;
    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !policy.is_broken(&err) {
            return Err(err);
        }
        tracing::warn!(
            operation = name,
            error = %err,
            "connection broken; retrying with a new connection"
        );
        if let Some(cb) = &policy.on_retry {
            cb(name, &err);
        }
        failures += 1;
        if let Some(cap) = policy.max_failures {
            if failures > cap {
                tracing::error!(operation = name, failures, "max retries reached; aborting");
                if let Some(cb) = &policy.on_max_failures {
                    cb(name, &err);
                }
                return Err(err);
            }
        }
        sleep(policy.interval).await;
    }
}
