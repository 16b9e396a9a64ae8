use anyhow::Result;
use futures::future::join_all;
use std::future::Future;
use std::time::Duration;

use crate::config::NetworkConfig;

/// Exponential backoff: attempt `n` waits `base * 2^n` before retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn from_config(network: &NetworkConfig) -> Self {
        Self {
            max_attempts: network.max_retries.max(1),
            backoff_base: Duration::from_millis(network.backoff_base_ms),
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Runs `op` until it succeeds or attempts run out; returns the last error.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 >= attempts => {
                tracing::warn!(label, attempts, "giving up: {e:#}");
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(label, attempt, ?delay, "retrying: {e:#}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Bounds fan-out: at most `batch_size` requests in flight, with a pause between batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl BatchPolicy {
    pub fn from_config(network: &NetworkConfig) -> Self {
        Self {
            batch_size: network.batch_size.max(1),
            batch_delay: Duration::from_millis(network.batch_delay_ms),
        }
    }
}

/// Runs `fetch` for every key, one batch at a time, preserving input order.
pub async fn fetch_in_batches<K, T, F, Fut>(keys: &[K], policy: &BatchPolicy, fetch: F) -> Vec<T>
where
    K: Clone,
    F: Fn(K) -> Fut,
    Fut: Future<Output = T>,
{
    let batch_size = policy.batch_size.max(1);
    let batches = keys.len().div_ceil(batch_size);
    let mut results = Vec::with_capacity(keys.len());

    for (i, chunk) in keys.chunks(batch_size).enumerate() {
        let batch = join_all(chunk.iter().cloned().map(&fetch)).await;
        results.extend(batch);
        if i + 1 < batches && !policy.batch_delay.is_zero() {
            tokio::time::sleep(policy.batch_delay).await;
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff_base: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff_base: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let result = retry(&fast_policy(3), "item", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                match n {
                    0 | 1 => Err(anyhow::anyhow!("flaky")),
                    _ => Ok(n),
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = retry(&fast_policy(3), "item", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(anyhow::anyhow!("down")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_batches_bound_concurrency_and_keep_order() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let keys: Vec<u32> = (0..60).collect();
        let policy = BatchPolicy {
            batch_size: 25,
            batch_delay: Duration::from_millis(1),
        };

        let results = fetch_in_batches(&keys, &policy, |k| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                k * 2
            }
        })
        .await;

        assert_eq!(results, keys.iter().map(|k| k * 2).collect::<Vec<_>>());
        assert!(peak.load(Ordering::SeqCst) <= 25);
    }
}
