use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::debug;
use url::Url;

use dragnet_core::{FetchConfig, FetchError, FetchResponse, PageSource, TierDriver};

/// Tier A: direct HTTP against the live site through the worker's shared
/// connection pool.
pub struct LiveDriver {
    client: reqwest::Client,
    permits: Arc<Semaphore>,
    timeout: Duration,
    retries: u32,
    concurrency: usize,
}

impl LiveDriver {
    pub fn new(client: reqwest::Client, concurrency: usize, timeout: Duration, retries: u32) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(concurrency)),
            timeout,
            retries,
            concurrency,
        }
    }
}

pub(crate) fn classify_reqwest_error(e: &reqwest::Error, timeout_secs: u64) -> FetchError {
    if e.is_timeout() {
        return FetchError::Timeout(timeout_secs);
    }
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("certificate") || lower.contains("tls") || lower.contains("handshake") {
        return FetchError::Tls(msg);
    }
    if lower.contains("reset") || lower.contains("broken pipe") {
        return FetchError::Reset(msg);
    }
    if e.is_connect() {
        return FetchError::Connect(msg);
    }
    FetchError::Network(msg)
}

/// Shared by every HTTP-backed tier: issue the request, enforce the body
/// cap, flatten headers.
pub(crate) async fn http_fetch(
    client: &reqwest::Client,
    url: &Url,
    config: &FetchConfig,
    timeout: Duration,
    source: PageSource,
) -> Result<FetchResponse, FetchError> {
    let start = Instant::now();

    let resp = client
        .get(url.as_str())
        .header("user-agent", &config.user_agent)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_reqwest_error(&e, timeout.as_secs()))?;

    let status = resp.status().as_u16();
    if !(200..400).contains(&status) {
        return Err(FetchError::Status(status));
    }

    let final_url = Url::parse(resp.url().as_str()).unwrap_or_else(|_| url.clone());

    let mut headers = HashMap::new();
    for (k, v) in resp.headers() {
        if let Ok(val) = v.to_str() {
            headers.insert(k.as_str().to_string(), val.to_string());
        }
    }
    let content_type = headers.get("content-type").cloned();

    let body = resp
        .bytes()
        .await
        .map_err(|e| classify_reqwest_error(&e, timeout.as_secs()))?;

    if body.len() > config.max_body_size {
        return Err(FetchError::BodyTooLarge {
            size: body.len(),
            max: config.max_body_size,
        });
    }

    Ok(FetchResponse {
        url: url.clone(),
        final_url,
        status,
        headers,
        body: body.to_vec(),
        content_type,
        source,
        fetched_at: chrono::Utc::now(),
        response_time_ms: start.elapsed().as_millis() as u64,
    })
}

#[async_trait]
impl TierDriver for LiveDriver {
    fn source(&self) -> PageSource {
        PageSource::Live
    }

    async fn fetch(&self, url: &Url, config: &FetchConfig) -> Result<FetchResponse, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        debug!(url = %url, "fetching live");
        http_fetch(&self.client, url, config, self.timeout, PageSource::Live).await
    }

    fn request_timeout(&self) -> Duration {
        self.timeout
    }

    fn max_concurrency(&self) -> usize {
        self.concurrency
    }

    fn max_retries(&self) -> u32 {
        self.retries
    }
}
