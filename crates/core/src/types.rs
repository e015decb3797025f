use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::error::FetchError;

/// Which acquisition tier produced a page's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSource {
    Live,
    ArchiveIndex,
    ArchiveLive,
    Render,
}

impl PageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSource::Live => "live",
            PageSource::ArchiveIndex => "archive_index",
            PageSource::ArchiveLive => "archive_live",
            PageSource::Render => "render",
        }
    }
}

impl fmt::Display for PageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification assigned to a URL before fetching. Governs which
/// downstream phases run for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionTier {
    /// Full scrape + extraction + link following.
    Full,
    /// Extract entities but never follow links.
    Extract,
    /// Record the URL and stop; no fetch.
    UrlOnly,
    /// Drop without a record.
    Skip,
}

/// Every fetch tier implements this. The Domain Pipeline walks an ordered
/// ladder of drivers, escalating on permanent-class failures.
#[async_trait]
pub trait TierDriver: Send + Sync + 'static {
    fn source(&self) -> PageSource;
    async fn fetch(&self, url: &Url, config: &FetchConfig) -> Result<FetchResponse, FetchError>;
    fn request_timeout(&self) -> Duration;
    fn max_concurrency(&self) -> usize;

    /// Transient-failure retries before this tier gives up on a URL.
    fn max_retries(&self) -> u32 {
        2
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub max_body_size: usize,
    pub min_body_bytes: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_body_size: 10 * 1024 * 1024,
            min_body_bytes: 64,
            user_agent: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: Url,
    /// Canonical final URL after redirects.
    pub final_url: Url,
    /// Final HTTP status (the archived status for archive tiers, 0 for render).
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub source: PageSource,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
    pub response_time_ms: u64,
}

impl FetchResponse {
    pub fn content_type_str(&self) -> &str {
        self.content_type.as_deref().unwrap_or("")
    }
}

/// Candidate URL queued for fetching within one domain's crawl.
#[derive(Debug, Clone)]
pub struct FrontierEntry {
    pub url: Url,
    pub depth: u32,
    pub parent: Option<String>,
}

/// Terminal classification of one Domain Pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Completed,
    DomainUnreachable,
    RobotsDenied,
    PartialTimeout,
    InternalError,
}

impl CompletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::Completed => "completed",
            CompletionStatus::DomainUnreachable => "domain_unreachable",
            CompletionStatus::RobotsDenied => "robots_denied",
            CompletionStatus::PartialTimeout => "partial_timeout",
            CompletionStatus::InternalError => "internal_error",
        }
    }
}

/// One completion line per seed, success or failure classification.
#[derive(Debug, Clone)]
pub struct DomainCompletion {
    pub seed: String,
    pub status: CompletionStatus,
    pub pages_emitted: u64,
    pub urls_seen: u64,
    pub duration_ms: u64,
}
