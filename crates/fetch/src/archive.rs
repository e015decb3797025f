use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::debug;
use url::Url;

use dragnet_core::{FetchConfig, FetchError, FetchResponse, PageSource, TierDriver};

use crate::live::{classify_reqwest_error, http_fetch};

const CDX_ENDPOINT: &str = "https://web.archive.org/cdx/search/cdx";
const AVAILABILITY_ENDPOINT: &str = "https://archive.org/wayback/available";
const REPLAY_BASE: &str = "https://web.archive.org/web";

/// Tier B: query the archive's CDX index for the newest 200-status capture,
/// then stream that capture's raw payload through the replay endpoint.
pub struct ArchiveIndexDriver {
    client: reqwest::Client,
    permits: Arc<Semaphore>,
    timeout: Duration,
    retries: u32,
    concurrency: usize,
}

impl ArchiveIndexDriver {
    pub fn new(client: reqwest::Client, concurrency: usize, timeout: Duration, retries: u32) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(concurrency)),
            timeout,
            retries,
            concurrency,
        }
    }

    async fn cdx_lookup(&self, url: &Url) -> Result<CdxRow, FetchError> {
        let lookup = Url::parse_with_params(
            CDX_ENDPOINT,
            &[
                ("url", url.as_str()),
                ("output", "json"),
                ("filter", "statuscode:200"),
                ("limit", "-1"),
            ],
        )
        .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        let resp = self
            .client
            .get(lookup)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e, self.timeout.as_secs()))?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(FetchError::Status(status));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(&e, self.timeout.as_secs()))?;

        parse_cdx_rows(&body).ok_or(FetchError::ArchiveMiss)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CdxRow {
    pub timestamp: String,
    pub original: String,
    pub mimetype: String,
    pub statuscode: u16,
}

/// CDX JSON output: a header row then capture rows
/// `[urlkey, timestamp, original, mimetype, statuscode, digest, length]`.
pub(crate) fn parse_cdx_rows(body: &[u8]) -> Option<CdxRow> {
    let rows: Vec<Vec<String>> = serde_json::from_slice(body).ok()?;
    let row = rows.get(1)?;
    if row.len() < 5 {
        return None;
    }
    Some(CdxRow {
        timestamp: row[1].clone(),
        original: row[2].clone(),
        mimetype: row[3].clone(),
        statuscode: row[4].parse().unwrap_or(200),
    })
}

/// `id_` replay URL for a capture: the original bytes without archive
/// chrome.
pub(crate) fn replay_url(timestamp: &str, original: &str) -> Result<Url, FetchError> {
    Url::parse(&format!("{REPLAY_BASE}/{timestamp}id_/{original}"))
        .map_err(|e| FetchError::InvalidUrl(e.to_string()))
}

#[async_trait]
impl TierDriver for ArchiveIndexDriver {
    fn source(&self) -> PageSource {
        PageSource::ArchiveIndex
    }

    async fn fetch(&self, url: &Url, config: &FetchConfig) -> Result<FetchResponse, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let row = self.cdx_lookup(url).await?;
        debug!(url = %url, timestamp = %row.timestamp, "archive index capture found");

        let replay = replay_url(&row.timestamp, &row.original)?;
        let mut resp = http_fetch(
            &self.client,
            &replay,
            config,
            self.timeout,
            PageSource::ArchiveIndex,
        )
        .await?;

        // The record reflects the archived page, not the replay plumbing.
        resp.url = url.clone();
        resp.final_url = Url::parse(&row.original).unwrap_or_else(|_| url.clone());
        resp.status = row.statuscode;
        if resp.content_type.is_none() && !row.mimetype.is_empty() && row.mimetype != "warc/revisit"
        {
            resp.content_type = Some(row.mimetype);
        }
        Ok(resp)
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

/// Tier C: ask the availability API for the closest live snapshot and fetch
/// it, no index scan.
pub struct ArchiveLiveDriver {
    client: reqwest::Client,
    permits: Arc<Semaphore>,
    timeout: Duration,
    retries: u32,
    concurrency: usize,
}

impl ArchiveLiveDriver {
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

/// `archived_snapshots.closest` from the availability API.
pub(crate) fn parse_availability(body: &[u8]) -> Option<(String, String, u16)> {
    let doc: serde_json::Value = serde_json::from_slice(body).ok()?;
    let closest = doc.get("archived_snapshots")?.get("closest")?;
    if !closest.get("available")?.as_bool()? {
        return None;
    }
    let timestamp = closest.get("timestamp")?.as_str()?.to_string();
    let url = closest.get("url")?.as_str()?.to_string();
    let status = closest
        .get("status")
        .and_then(|s| s.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(200);
    Some((timestamp, url, status))
}

#[async_trait]
impl TierDriver for ArchiveLiveDriver {
    fn source(&self) -> PageSource {
        PageSource::ArchiveLive
    }

    async fn fetch(&self, url: &Url, config: &FetchConfig) -> Result<FetchResponse, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let lookup = Url::parse_with_params(AVAILABILITY_ENDPOINT, &[("url", url.as_str())])
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        let resp = self
            .client
            .get(lookup)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e, self.timeout.as_secs()))?;
        let body = resp
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(&e, self.timeout.as_secs()))?;

        let (timestamp, original, status) =
            parse_availability(&body).ok_or(FetchError::ArchiveMiss)?;
        debug!(url = %url, timestamp = %timestamp, "live snapshot available");

        // The availability URL replays with chrome; refetch raw via id_.
        let stripped = original
            .rsplit_once("/web/")
            .and_then(|(_, tail)| tail.split_once('/'))
            .map(|(_, target)| target.to_string())
            .unwrap_or_else(|| url.to_string());
        let replay = replay_url(&timestamp, &stripped)?;

        let mut out = http_fetch(
            &self.client,
            &replay,
            config,
            self.timeout,
            PageSource::ArchiveLive,
        )
        .await?;
        out.url = url.clone();
        out.final_url = Url::parse(&stripped).unwrap_or_else(|_| url.clone());
        out.status = status;
        Ok(out)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cdx_rows() {
        let body = br#"[["urlkey","timestamp","original","mimetype","statuscode","digest","length"],
            ["com,example)/","20240105123456","https://example.com/","text/html","200","ABCDEF","5120"]]"#;
        let row = parse_cdx_rows(body).unwrap();
        assert_eq!(row.timestamp, "20240105123456");
        assert_eq!(row.original, "https://example.com/");
        assert_eq!(row.statuscode, 200);
    }

    #[test]
    fn test_parse_cdx_empty_is_miss() {
        assert!(parse_cdx_rows(b"[]").is_none());
        assert!(parse_cdx_rows(
            br#"[["urlkey","timestamp","original","mimetype","statuscode","digest","length"]]"#
        )
        .is_none());
        assert!(parse_cdx_rows(b"not json").is_none());
    }

    #[test]
    fn test_replay_url_uses_raw_flag() {
        let u = replay_url("20240105123456", "https://example.com/").unwrap();
        assert_eq!(
            u.as_str(),
            "https://web.archive.org/web/20240105123456id_/https://example.com/"
        );
    }

    #[test]
    fn test_parse_availability() {
        let body = br#"{"url":"https://dead-site.example/","archived_snapshots":{"closest":{"available":true,"url":"http://web.archive.org/web/20230801000000/https://dead-site.example/","timestamp":"20230801000000","status":"200"}}}"#;
        let (ts, url, status) = parse_availability(body).unwrap();
        assert_eq!(ts, "20230801000000");
        assert!(url.contains("dead-site.example"));
        assert_eq!(status, 200);
    }

    #[test]
    fn test_parse_availability_none_when_absent() {
        let body = br#"{"url":"https://x.example/","archived_snapshots":{}}"#;
        assert!(parse_availability(body).is_none());
    }
}
