use std::{fmt::Display, future::Future, time::Duration};

/// How often and how patiently a remote call is retried.
#[derive(Debug, Clone, Copy)]
pub struct RetrySpec {
    /// Number of retries after the initial attempt.
    pub max_attempts: u32,
    /// Fixed pause between two attempts.
    pub delay: Duration,
}

/// Wraps a remote call and retries it on failures the caller classifies as
/// transient. Failures classified as permanent are returned immediately so
/// callers can surface them to a user without waiting out the retry budget.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    spec: RetrySpec,
}

impl RetryPolicy {
    pub fn new(spec: RetrySpec) -> Self {
        Self { spec }
    }

    /// Runs `operation` up to `max_attempts + 1` times, sleeping `delay`
    /// between attempts. Returns the first success, the first permanent
    /// error, or the last transient error once attempts are exhausted.
    pub async fn execute<T, E, F, Fut>(
        &self,
        operation: F,
        is_transient: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt: u32 = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) && attempt < self.spec.max_attempts => {
                    attempt += 1;
                    tracing::debug!(
                        %err,
                        attempt,
                        delay = ?self.spec.delay,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(self.spec.delay).await;
                }
                Err(err) => {
                    if is_transient(&err) {
                        tracing::warn!(%err, "giving up after exhausting all retries");
                    }
                    return Err(err);
                }
            }
        }
    }
}
