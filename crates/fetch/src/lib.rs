pub mod archive;
pub mod live;
pub mod render;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use dragnet_core::{AppConfig, TierDriver};

pub use archive::{ArchiveIndexDriver, ArchiveLiveDriver};
pub use live::LiveDriver;
pub use render::RenderDriver;
pub use retry::{backoff_delay, fetch_with_retries};

/// The ordered A→D fallback ladder, shared by every pipeline in a worker.
/// Each driver carries its own concurrency ceiling; the HTTP client (and
/// its connection pool) is shared underneath.
pub struct TierLadder {
    drivers: Vec<Arc<dyn TierDriver>>,
}

impl TierLadder {
    pub fn from_config(config: &AppConfig, client: reqwest::Client) -> Self {
        let mut drivers: Vec<Arc<dyn TierDriver>> = Vec::new();

        if config.tier_a.enabled {
            drivers.push(Arc::new(LiveDriver::new(
                client.clone(),
                config.tier_a.concurrency,
                Duration::from_secs(config.tier_a.timeout_seconds),
                config.tier_a.retries,
            )));
        }
        if config.tier_b.enabled {
            drivers.push(Arc::new(ArchiveIndexDriver::new(
                client.clone(),
                config.tier_b.concurrency,
                Duration::from_secs(config.tier_b.timeout_seconds),
                config.tier_b.retries,
            )));
        }
        if config.tier_c.enabled {
            drivers.push(Arc::new(ArchiveLiveDriver::new(
                client.clone(),
                config.tier_c.concurrency,
                Duration::from_secs(config.tier_c.timeout_seconds),
                config.tier_c.retries,
            )));
        }
        if config.tier_d.enabled {
            drivers.push(Arc::new(RenderDriver::new(
                config.tier_d.concurrency,
                Duration::from_secs(config.tier_d.timeout_seconds),
            )));
        }

        Self { drivers }
    }

    /// Build directly from drivers; test pipelines stub the tiers this way.
    pub fn from_drivers(drivers: Vec<Arc<dyn TierDriver>>) -> Self {
        Self { drivers }
    }

    pub fn drivers(&self) -> &[Arc<dyn TierDriver>] {
        &self.drivers
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

/// One pooled client per worker process. Pool size tracks the tier-A
/// ceiling; proxies come from HTTP_PROXY/HTTPS_PROXY via reqwest itself.
pub fn build_http_client(user_agent: &str, pool_size: usize) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .pool_max_idle_per_host(pool_size)
        .redirect(reqwest::redirect::Policy::limited(10))
        .connect_timeout(Duration::from_secs(10))
        .build()?;
    Ok(client)
}
