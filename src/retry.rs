use crate::error::{FailureKind, ShortgenError, ShortgenResult};
use rand::Rng;
use std::time::Duration;
use tracing::warn;

/// Backoff schedule for provider calls that can fail transiently.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `attempt` (1-based): exponential with full jitter,
    /// capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32, jitter: f64) -> Duration {
        let exp = self.base_delay.as_secs_f64() * 2f64.powi(attempt.saturating_sub(1) as i32);
        let capped = exp.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped * jitter.clamp(0.0, 1.0))
    }
}

/// Run `op` up to `policy.max_attempts` times, sleeping between attempts.
///
/// Only transient failures are retried; a permanent failure (bad key, 4xx)
/// returns immediately so callers can move on to the next provider.
pub fn with_retry<T, F>(label: &str, policy: &RetryPolicy, mut op: F) -> ShortgenResult<T>
where
    F: FnMut() -> ShortgenResult<T>,
{
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                if err.failure_kind() == FailureKind::Permanent || attempt >= policy.max_attempts {
                    return Err(err);
                }
                let jitter = rand::thread_rng().gen_range(0.5..=1.0);
                let delay = policy.delay_for(attempt, jitter);
                warn!(
                    "{} failed (attempt {}/{}), retrying in {:.1}s: {}",
                    label,
                    attempt,
                    policy.max_attempts,
                    delay.as_secs_f64(),
                    err
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    fn transient(msg: &str) -> ShortgenError {
        ShortgenError::Provider {
            provider: "test".into(),
            kind: FailureKind::Transient,
            message: msg.into(),
        }
    }

    fn permanent(msg: &str) -> ShortgenError {
        ShortgenError::Provider {
            provider: "test".into(),
            kind: FailureKind::Permanent,
            message: msg.into(),
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_succeeds_after_transient_failures() {
        let mut calls = 0;
        let result = with_retry("op", &fast_policy(), || {
            calls += 1;
            if calls < 3 {
                Err(transient("flaky"))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_permanent_failure_not_retried() {
        let mut calls = 0;
        let result: ShortgenResult<()> = with_retry("op", &fast_policy(), || {
            calls += 1;
            Err(permanent("bad key"))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: ShortgenResult<()> = with_retry("op", &fast_policy(), || {
            calls += 1;
            Err(transient("still down"))
        });
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
        };
        assert_eq!(policy.delay_for(1, 1.0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2, 1.0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3, 1.0), Duration::from_secs(4));
        // capped
        assert_eq!(policy.delay_for(4, 1.0), Duration::from_secs(4));
        // jitter scales downward
        assert_eq!(policy.delay_for(1, 0.5), Duration::from_millis(500));
    }
}
