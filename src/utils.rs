use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::debug;

/// Retries `operation` with Fibonacci backoff, returning the last error once
/// `max_retries` is exhausted.
///
/// Only used for polling resources into a ready state; mutating calls are
/// never retried. The sleeps run `initial_delay` times 1, 1, 2, 3, 5, ...,
/// so the total wait is [`backoff_budget`]. The DynamoDB activation poll
/// uses 1s and 8 retries, giving up after 54s of sleeping.
pub async fn retry_with_backoff<T, E, Fut, F>(
    operation: F,
    initial_delay: Duration,
    max_retries: usize,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Debug,
{
    let mut retries = 0;
    let mut fib = (initial_delay, initial_delay);

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if retries < max_retries => {
                debug!(
                    "Operation failed: {:?}. Retrying in {:?} (attempt {}/{})",
                    e,
                    fib.0,
                    retries + 1,
                    max_retries
                );
                sleep(fib.0).await;
                retries += 1;
                fib = (fib.1, fib.0 + fib.1);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Total time [`retry_with_backoff`] sleeps before giving up.
pub fn backoff_budget(initial_delay: Duration, max_retries: usize) -> Duration {
    let mut fib = (initial_delay, initial_delay);
    let mut total = Duration::ZERO;
    for _ in 0..max_retries {
        total += fib.0;
        fib = (fib.1, fib.0 + fib.1);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_retry_until_success() {
        let counter = AtomicUsize::new(0);
        let attempts = &counter;
        let result: Result<usize, String> = retry_with_backoff(
            || async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(format!("attempt {n}"))
                } else {
                    Ok(n)
                }
            },
            Duration::from_millis(10),
            5,
        )
        .await;

        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let counter = AtomicUsize::new(0);
        let attempts = &counter;
        let result: Result<(), String> = retry_with_backoff(
            || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err("never ready".to_string())
            },
            Duration::from_millis(10),
            2,
        )
        .await;

        assert_eq!(result, Err("never ready".to_string()));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_budget() {
        assert_eq!(backoff_budget(Duration::from_secs(1), 8), Duration::from_secs(54));
        assert_eq!(backoff_budget(Duration::from_millis(10), 2), Duration::from_millis(20));
        assert_eq!(backoff_budget(Duration::from_secs(1), 0), Duration::ZERO);
    }
}
