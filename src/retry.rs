use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use log::warn;

/// Fixed-attempt, fixed-backoff retry for transient network failures. The
/// discovery and download stages share this one policy; callers decide what
/// an exhausted budget means (skip the batch, skip the page).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }

    /// Runs `op` until it succeeds or the attempt budget is spent, sleeping
    /// `backoff` between attempts. Every failure is logged with `label`;
    /// the last error is returned on exhaustion.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!("{} failed (attempt {}/{}): {}", label, attempt, self.attempts, err);
                    if attempt >= self.attempts {
                        return Err(err);
                    }
                }
            }
            tokio::time::sleep(self.backoff).await;
        }
    }
}
