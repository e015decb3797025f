use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::warn;
use url::Url;

use dragnet_core::{FetchConfig, FetchError, FetchResponse, TierDriver};

/// Exponential backoff: base 500 ms, factor 2, 25% jitter either way.
pub fn backoff_delay(attempt: u32) -> Duration {
    let base_ms = 500u64 * 2u64.saturating_pow(attempt);
    let jitter = rand::thread_rng().gen_range(0.75..=1.25);
    Duration::from_millis((base_ms as f64 * jitter) as u64)
}

/// One tier's full attempt at a URL: transient failures retry in-tier with
/// backoff; permanent failures (403 included) return immediately so the
/// caller can escalate.
pub async fn fetch_with_retries(
    driver: &dyn TierDriver,
    url: &Url,
    config: &FetchConfig,
) -> Result<FetchResponse, FetchError> {
    let mut attempt = 0u32;
    loop {
        match driver.fetch(url, config).await {
            Ok(resp) => return Ok(resp),
            Err(e) if e.is_transient() && attempt < driver.max_retries() => {
                let delay = backoff_delay(attempt);
                warn!(
                    url = %url,
                    tier = %driver.source(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient fetch failure, retrying in-tier"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dragnet_core::PageSource;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyDriver {
        calls: AtomicU32,
        fail_times: u32,
        error: fn() -> FetchError,
    }

    #[async_trait]
    impl TierDriver for FlakyDriver {
        fn source(&self) -> PageSource {
            PageSource::Live
        }

        async fn fetch(
            &self,
            url: &Url,
            _config: &FetchConfig,
        ) -> Result<FetchResponse, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                return Err((self.error)());
            }
            Ok(FetchResponse {
                url: url.clone(),
                final_url: url.clone(),
                status: 200,
                headers: HashMap::new(),
                body: b"ok".to_vec(),
                content_type: Some("text/html".into()),
                source: PageSource::Live,
                fetched_at: chrono::Utc::now(),
                response_time_ms: 1,
            })
        }

        fn request_timeout(&self) -> Duration {
            Duration::from_secs(10)
        }

        fn max_concurrency(&self) -> usize {
            1
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_retried_then_succeeds() {
        let driver = FlakyDriver {
            calls: AtomicU32::new(0),
            fail_times: 2,
            error: || FetchError::Status(503),
        };
        let url = Url::parse("https://example.com/").unwrap();
        let resp = fetch_with_retries(&driver, &url, &FetchConfig::default())
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(driver.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_exhausted_after_two_retries() {
        let driver = FlakyDriver {
            calls: AtomicU32::new(0),
            fail_times: 10,
            error: || FetchError::Timeout(10),
        };
        let url = Url::parse("https://example.com/").unwrap();
        let err = fetch_with_retries(&driver, &url, &FetchConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
        // initial attempt + 2 retries
        assert_eq!(driver.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_never_retried() {
        let driver = FlakyDriver {
            calls: AtomicU32::new(0),
            fail_times: 10,
            error: || FetchError::Status(403),
        };
        let url = Url::parse("https://example.com/").unwrap();
        let err = fetch_with_retries(&driver, &url, &FetchConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(driver.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_grows() {
        let d0 = backoff_delay(0);
        let d2 = backoff_delay(2);
        assert!(d0 >= Duration::from_millis(375) && d0 <= Duration::from_millis(625));
        assert!(d2 >= Duration::from_millis(1500) && d2 <= Duration::from_millis(2500));
    }
}
