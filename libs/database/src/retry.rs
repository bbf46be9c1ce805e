use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Backoff schedule for startup operations such as the first connection.
///
/// The delay before retry `n` (1-based) is `initial_delay * multiplier^(n-1)`,
/// capped at `max_delay`. With jitter enabled each delay is scaled into
/// the `[50%, 100%]` band.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero behaves like one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Delay to wait after the given failed attempt (1-based), before jitter.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let scaled = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    /// Five attempts, 250ms initial delay doubling up to 5s, jittered.
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Run `operation` until it succeeds or the policy's attempts are exhausted.
///
/// The last error is returned unchanged. `label` names the operation in logs.
pub async fn retry_with_backoff<F, Fut, T, E>(
    label: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation = label, attempt, "Succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) if attempt >= attempts => {
                warn!(operation = label, attempts, error = %e, "Giving up");
                return Err(e);
            }
            Err(e) => {
                let base = policy.delay_after(attempt);
                let delay = if policy.jitter { apply_jitter(base) } else { base };

                warn!(
                    operation = label,
                    attempt,
                    max_attempts = attempts,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

fn apply_jitter(delay: Duration) -> Duration {
    use std::collections::hash_map::RandomState;
    use std::hash::BuildHasher;

    // 0.50 ..= 0.99
    let factor = (RandomState::new().hash_one(std::time::SystemTime::now()) % 50) as f64 / 100.0 + 0.5;
    delay.mul_f64(factor)
}
