use std::collections::HashMap;
use std::ffi::OsString;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptionsBuilder};
use tokio::sync::Semaphore;
use tracing::debug;
use url::Url;

use dragnet_core::{FetchConfig, FetchError, FetchResponse, PageSource, TierDriver};

/// Tier D: last resort. Launch a headless browser, let scripts run, take
/// the rendered DOM. Single-digit concurrency; the semaphore is the only
/// thing standing between this tier and a fork bomb of Chromium processes.
pub struct RenderDriver {
    permits: Arc<Semaphore>,
    timeout: Duration,
    concurrency: usize,
}

impl RenderDriver {
    pub fn new(concurrency: usize, timeout: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(concurrency)),
            timeout,
            concurrency,
        }
    }
}

fn render_blocking(url: &Url, timeout: Duration) -> Result<String, FetchError> {
    let mut extra_args: Vec<OsString> = Vec::new();
    // Required when running inside containers.
    extra_args.push(OsString::from("--no-sandbox"));
    extra_args.push(OsString::from("--disable-dev-shm-usage"));
    extra_args.push(OsString::from("--disable-gpu"));

    let mut builder = LaunchOptionsBuilder::default();
    builder
        .headless(true)
        .window_size(Some((1366, 900)))
        .idle_browser_timeout(timeout)
        .args(extra_args.iter().map(|a| a.as_ref()).collect());

    if let Ok(chrome_path) = std::env::var("CHROME_PATH") {
        builder.path(Some(std::path::PathBuf::from(chrome_path)));
    }

    let options = builder
        .build()
        .map_err(|e| FetchError::Render(e.to_string()))?;
    let browser = Browser::new(options).map_err(|e| FetchError::Render(e.to_string()))?;

    let tab = browser
        .new_tab()
        .map_err(|e| FetchError::Render(e.to_string()))?;
    tab.navigate_to(url.as_str())
        .map_err(|e| FetchError::Render(e.to_string()))?;
    tab.wait_until_navigated()
        .map_err(|e| FetchError::Render(e.to_string()))?;

    tab.get_content()
        .map_err(|e| FetchError::Render(e.to_string()))
}

#[async_trait]
impl TierDriver for RenderDriver {
    fn source(&self) -> PageSource {
        PageSource::Render
    }

    async fn fetch(&self, url: &Url, config: &FetchConfig) -> Result<FetchResponse, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FetchError::Render(e.to_string()))?;

        let start = Instant::now();
        debug!(url = %url, "rendering via headless browser");

        let target = url.clone();
        let budget = self.timeout;
        let handle = tokio::task::spawn_blocking(move || render_blocking(&target, budget));
        let html = match tokio::time::timeout(self.timeout, handle).await {
            Err(_) => return Err(FetchError::Timeout(self.timeout.as_secs())),
            Ok(Err(join_err)) => return Err(FetchError::Render(join_err.to_string())),
            Ok(Ok(result)) => result?,
        };

        let body = html.into_bytes();
        if body.len() > config.max_body_size {
            return Err(FetchError::BodyTooLarge {
                size: body.len(),
                max: config.max_body_size,
            });
        }

        Ok(FetchResponse {
            url: url.clone(),
            final_url: url.clone(),
            // Not an HTTP acquisition; the DOM came out of the renderer.
            status: 0,
            headers: HashMap::new(),
            body,
            content_type: Some("text/html".to_string()),
            source: PageSource::Render,
            fetched_at: chrono::Utc::now(),
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn request_timeout(&self) -> Duration {
        self.timeout
    }

    fn max_concurrency(&self) -> usize {
        self.concurrency
    }

    /// Rendering is too expensive to retry; one shot per URL.
    fn max_retries(&self) -> u32 {
        0
    }
}
