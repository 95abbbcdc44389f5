use std::future::Future;
use std::time::Duration;

use rand::Rng;

use super::AiError;

/// Retry an AI call on rate-limit signals with exponential backoff and
/// jitter. Delay for attempt n is `2^n * base + jitter`; non-transient
/// errors propagate immediately, and exhaustion surfaces the last error.
pub async fn retry_ai<F, Fut, T>(
    max_attempts: u32,
    base_delay_ms: u64,
    mut operation: F,
) -> Result<T, AiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AiError>>,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let jitter = rand::thread_rng().gen_range(0..1000u64);
                let delay = Duration::from_millis(2u64.pow(attempt) * base_delay_ms + jitter);
                tracing::warn!(
                    "AI rate limit ({}/{}), waiting {:?}: {}",
                    attempt,
                    max_attempts,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn rate_limited() -> AiError {
        AiError::Status {
            status: 429,
            message: "Quota exceeded".into(),
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result = retry_ai(3, 1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, AiError>(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_ai(3, 1, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(rate_limited())
                } else {
                    Ok("priced")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "priced");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_surfaces_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_ai(3, 1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(rate_limited()) }
        })
        .await;
        assert!(matches!(
            result.unwrap_err(),
            AiError::Status { status: 429, .. }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn hard_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_ai(3, 1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(AiError::Status {
                    status: 400,
                    message: "invalid request".into(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
