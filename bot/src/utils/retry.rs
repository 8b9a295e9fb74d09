use std::time::Duration;

/// Bounded retry policy: attempt budget plus a doubling backoff schedule
/// with optional jitter. Kept as an explicit object so tests can assert
/// attempt counts with millisecond backoffs instead of waiting out real
/// delays.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
            jitter_max: Some(Duration::from_millis(100)),
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt budget and the default schedule.
    pub fn with_attempts(max_attempts: usize) -> Self {
        Self { max_attempts, ..Self::default() }
    }
}

/// Runs `f` until it succeeds or the policy's attempt budget is spent,
/// sleeping the backoff schedule between attempts. Returns the last
/// error when every attempt failed.
pub async fn retry<F, Fut, T, E>(policy: &RetryPolicy, f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    retry_if(policy, |_| true, f).await
}

/// Like [`retry`], but only errors accepted by `should_retry` consume
/// further attempts; any other error is returned immediately.
pub async fn retry_if<F, Fut, T, E, P>(policy: &RetryPolicy, should_retry: P, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempts_left = policy.max_attempts.max(1);
    let mut backoff = policy.base_backoff;

    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempts_left -= 1;
                if attempts_left == 0 || !should_retry(&err) {
                    return Err(err);
                }

                let jitter = match policy.jitter_max {
                    Some(max) if !max.is_zero() => {
                        Duration::from_millis(rand::random::<u64>() % (max.as_millis() as u64 + 1))
                    }
                    _ => Duration::ZERO,
                };
                tokio::time::sleep(backoff + jitter).await;

                backoff = (backoff * 2).min(policy.max_backoff);
            }
        }
    }
}
