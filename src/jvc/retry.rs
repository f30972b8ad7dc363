//! Linear backoff for connection establishment.

use crate::error::{ProjectorError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Failures before this attempt number are expected noise from the device's
/// single connection slot and are only logged at debug level.
const WARN_FROM_ATTEMPT: u32 = 4;

/// How many times to try, and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Sleep after failed attempt `n` is `n * step`.
    pub step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            step: Duration::from_millis(1100),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based), or `None` if it was the last one.
    ///
    /// The wait grows after each failure and nothing is slept once the final
    /// attempt has failed: with the defaults that is nine sleeps of 1.1 s up
    /// to 9.9 s, 49.5 s in total.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        (attempt >= 1 && attempt < self.attempts).then(|| self.step * attempt)
    }

    /// The full sleep schedule for a run where every attempt fails.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..self.attempts).filter_map(|attempt| self.delay_after(attempt))
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// `op` receives the 1-based attempt number. Exhaustion yields
/// [`ProjectorError::DidNotConnect`] carrying the last failure.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = String::from("no attempts made");

    for attempt in 1..=policy.attempts {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("Connected on attempt {attempt}");
                }
                return Ok(value);
            }
            Err(e) => {
                if attempt >= WARN_FROM_ATTEMPT {
                    warn!("Connection attempt {attempt}/{} failed: {e}", policy.attempts);
                } else {
                    debug!("Connection attempt {attempt}/{} failed: {e}", policy.attempts);
                }
                last_error = e.to_string();
            }
        }

        if let Some(delay) = policy.delay_after(attempt) {
            tokio::time::sleep(delay).await;
        }
    }

    Err(ProjectorError::DidNotConnect {
        attempts: policy.attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = policy.delays().map(|d| d.as_millis() as u64).collect();
        assert_eq!(delays, vec![1100, 2200, 3300, 4400, 5500, 6600, 7700, 8800, 9900]);
        assert_eq!(policy.delay_after(10), None);
        assert_eq!(policy.delay_after(0), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_timing() {
        let policy = RetryPolicy::default();
        let start = Instant::now();
        let mut starts = Vec::new();

        let result: Result<()> = retry(&policy, |attempt| {
            starts.push((attempt, start.elapsed()));
            async { Err(ProjectorError::handshake("no PJ_OK")) }
        })
        .await;

        match result {
            Err(ProjectorError::DidNotConnect { attempts, last_error }) => {
                assert_eq!(attempts, 10);
                assert!(last_error.contains("no PJ_OK"));
            }
            other => panic!("expected DidNotConnect, got {other:?}"),
        }

        assert_eq!(starts.len(), 10);
        let gaps: Vec<u128> = starts
            .windows(2)
            .map(|w| (w[1].1 - w[0].1).as_millis())
            .collect();
        assert_eq!(gaps, vec![1100, 2200, 3300, 4400, 5500, 6600, 7700, 8800, 9900]);
        // No sleep after the final failure.
        assert_eq!(start.elapsed().as_millis(), 49_500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_stops_on_success() {
        let policy = RetryPolicy::default();
        let mut calls = 0;

        let value = retry(&policy, |attempt| {
            calls += 1;
            async move {
                if attempt < 3 {
                    Err(ProjectorError::handshake("busy"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls, 3);
    }
}
