use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_interval: Duration::from_millis(200),
            multiplier: 2.0,
            max_interval: Duration::from_secs(2),
        }
    }
}

/// Retries `operation` with exponential backoff while `is_transient` holds.
pub async fn retry_with_backoff<F, Fut, T, E, R>(
    config: &RetryConfig,
    operation_name: &str,
    is_transient: R,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let mut attempt = 0;
    let mut delay = config.initial_interval;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if is_transient(&e) && attempt < config.max_retries => {
                attempt += 1;
                log::warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    operation_name,
                    attempt,
                    config.max_retries,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = Duration::from_millis((delay.as_millis() as f64 * config.multiplier) as u64)
                    .min(config.max_interval);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_interval: Duration::from_millis(1),
            multiplier: 2.0,
            max_interval: Duration::from_millis(4),
        }
    }

    #[actix_web::test]
    async fn succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let result: Result<u32, String> = retry_with_backoff(&fast(3), "put", |_| true, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err("throttled".to_string())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.get(), 3);
    }

    #[actix_web::test]
    async fn gives_up_after_max_retries() {
        let calls = Cell::new(0);
        let result: Result<(), String> = retry_with_backoff(&fast(2), "put", |_| true, || {
            calls.set(calls.get() + 1);
            async { Err("down".to_string()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[actix_web::test]
    async fn permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), String> = retry_with_backoff(&fast(5), "query", |_| false, || {
            calls.set(calls.get() + 1);
            async { Err("bad item".to_string()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
