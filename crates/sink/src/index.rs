use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use dragnet_core::{Record, SinkError};

use crate::{RecordSink, SinkStats};

/// How a bulk body reaches the cluster. An explicit seam so the flush loop
/// can be exercised without a search cluster behind it.
#[async_trait]
pub trait BulkTransport: Send + Sync + 'static {
    async fn send(&self, body: String) -> Result<(), SinkError>;
}

/// POST to `/_bulk` as newline-delimited JSON. 429s and 5xx come back as
/// retryable; other rejections are permanent.
pub struct HttpBulkTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBulkTransport {
    pub fn new(client: reqwest::Client, es_host: &str, es_port: u16) -> Self {
        Self {
            client,
            endpoint: format!("http://{es_host}:{es_port}/_bulk"),
        }
    }
}

pub(crate) fn classify_bulk_status(status: u16) -> Option<SinkError> {
    match status {
        200..=299 => None,
        429 => Some(SinkError::BulkRetryable(format!("http {status}"))),
        500..=599 => Some(SinkError::BulkRetryable(format!("http {status}"))),
        _ => Some(SinkError::BulkPermanent(format!("http {status}"))),
    }
}

#[async_trait]
impl BulkTransport for HttpBulkTransport {
    async fn send(&self, body: String) -> Result<(), SinkError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| SinkError::BulkRetryable(e.to_string()))?;

        if let Some(err) = classify_bulk_status(resp.status().as_u16()) {
            return Err(err);
        }

        // Item-level rejections don't fail the batch; surface them.
        if let Ok(bytes) = resp.bytes().await {
            if let Ok(doc) = serde_json::from_slice::<serde_json::Value>(&bytes) {
                if doc.get("errors").and_then(|e| e.as_bool()) == Some(true) {
                    warn!("bulk response reported item-level errors");
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BulkConfig {
    pub index: String,
    pub chunk_size: usize,
    pub deterministic_ids: bool,
    pub max_retries: u32,
    /// Where records go if the cluster stays down.
    pub spill_path: PathBuf,
}

/// Retry ladder for one bulk call: base 1 s, factor 2, capped at 30 s.
pub(crate) fn bulk_backoff(attempt: u32) -> Duration {
    let secs = 1u64.checked_shl(attempt).unwrap_or(u64::MAX).min(30);
    Duration::from_secs(secs)
}

/// Alternating action/document NDJSON for one buffered batch.
pub(crate) fn build_bulk_body(
    records: &[Record],
    index: &str,
    deterministic_ids: bool,
) -> Result<String, SinkError> {
    let mut body = String::new();
    for record in records {
        let action = if deterministic_ids {
            let id = format!("{:x}", Sha256::digest(record.url().as_bytes()));
            serde_json::json!({"index": {"_index": index, "_id": id}})
        } else {
            serde_json::json!({"index": {"_index": index}})
        };
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(record)?);
        body.push('\n');
    }
    Ok(body)
}

/// Index-mode sink: a bounded queue in front of a single flush task. The
/// queue holds 2x the bulk chunk; when the cluster lags, `submit` awaits,
/// which is exactly the backpressure the pipelines need to feel.
pub struct BulkIndexSink {
    tx: Mutex<Option<mpsc::Sender<Record>>>,
    accepted: AtomicU64,
    flusher: Mutex<Option<JoinHandle<SinkStats>>>,
}

impl BulkIndexSink {
    pub fn new(transport: impl BulkTransport, config: BulkConfig) -> Self {
        let (tx, rx) = mpsc::channel::<Record>(config.chunk_size * 2);
        let flusher = tokio::spawn(flush_loop(rx, transport, config));
        Self {
            tx: Mutex::new(Some(tx)),
            accepted: AtomicU64::new(0),
            flusher: Mutex::new(Some(flusher)),
        }
    }
}

#[async_trait]
impl RecordSink for BulkIndexSink {
    async fn submit(&self, record: Record) -> Result<(), SinkError> {
        let tx = {
            let guard = self.tx.lock().await;
            guard.clone().ok_or(SinkError::Closed)?
        };
        tx.send(record).await.map_err(|_| SinkError::Closed)?;
        self.accepted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn close(&self) -> Result<SinkStats, SinkError> {
        self.tx.lock().await.take();
        let handle = { self.flusher.lock().await.take() };
        let mut stats = match handle {
            Some(h) => h
                .await
                .map_err(|e| SinkError::BulkPermanent(format!("flusher died: {e}")))?,
            None => return Err(SinkError::Closed),
        };
        stats.accepted = self.accepted.load(Ordering::Relaxed);
        Ok(stats)
    }
}

enum FlushTarget {
    Cluster,
    Spill(BufWriter<tokio::fs::File>),
}

async fn flush_loop(
    mut rx: mpsc::Receiver<Record>,
    transport: impl BulkTransport,
    config: BulkConfig,
) -> SinkStats {
    let mut stats = SinkStats::default();
    let mut buffer: Vec<Record> = Vec::with_capacity(config.chunk_size);
    let mut target = FlushTarget::Cluster;

    while let Some(record) = rx.recv().await {
        buffer.push(record);
        if buffer.len() >= config.chunk_size {
            flush_batch(&mut buffer, &mut target, &transport, &config, &mut stats).await;
        }
    }
    if !buffer.is_empty() {
        flush_batch(&mut buffer, &mut target, &transport, &config, &mut stats).await;
    }
    if let FlushTarget::Spill(mut writer) = target {
        if let Err(e) = writer.flush().await {
            error!(error = %e, "spill file final flush failed");
        }
    }
    stats
}

async fn flush_batch(
    buffer: &mut Vec<Record>,
    target: &mut FlushTarget,
    transport: &impl BulkTransport,
    config: &BulkConfig,
    stats: &mut SinkStats,
) {
    if let FlushTarget::Cluster = target {
        match submit_with_retry(buffer, transport, config).await {
            Ok(()) => {
                stats.durable += buffer.len() as u64;
                buffer.clear();
                return;
            }
            Err(e) => {
                warn!(
                    error = %e,
                    spill = %config.spill_path.display(),
                    "bulk indexing failed permanently, falling back to file mode"
                );
                stats.fell_back = true;
                match open_spill(&config.spill_path).await {
                    Ok(writer) => *target = FlushTarget::Spill(writer),
                    Err(io) => {
                        // Nowhere left to put records; drop the batch loudly.
                        error!(error = %io, "spill file open failed, dropping batch");
                        buffer.clear();
                        return;
                    }
                }
            }
        }
    }

    if let FlushTarget::Spill(writer) = target {
        for record in buffer.iter() {
            match serde_json::to_string(record) {
                Ok(line) => {
                    if let Err(e) = writer.write_all(line.as_bytes()).await {
                        error!(error = %e, "spill write failed");
                        continue;
                    }
                    let _ = writer.write_all(b"\n").await;
                    stats.spilled += 1;
                    stats.durable += 1;
                }
                Err(e) => error!(error = %e, "record serialization failed"),
            }
        }
        if let Err(e) = writer.flush().await {
            error!(error = %e, "spill flush failed");
        }
        buffer.clear();
    }
}

async fn submit_with_retry(
    records: &[Record],
    transport: &impl BulkTransport,
    config: &BulkConfig,
) -> Result<(), SinkError> {
    let body = build_bulk_body(records, &config.index, config.deterministic_ids)?;
    let mut attempt = 0u32;
    loop {
        match transport.send(body.clone()).await {
            Ok(()) => return Ok(()),
            Err(SinkError::BulkRetryable(msg)) if attempt < config.max_retries => {
                let delay = bulk_backoff(attempt);
                warn!(
                    attempt,
                    delay_s = delay.as_secs(),
                    error = %msg,
                    "bulk submission failed, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(SinkError::BulkRetryable(msg)) => {
                return Err(SinkError::BulkPermanent(format!(
                    "retries exhausted: {msg}"
                )))
            }
            Err(e) => return Err(e),
        }
    }
}

async fn open_spill(path: &PathBuf) -> std::io::Result<BufWriter<tokio::fs::File>> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path).await?;
    info!(path = %path.display(), "spill file open");
    Ok(BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dragnet_core::{FailedMarker, FetchFailure, PageSource};
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    fn record(url: &str) -> Record {
        Record::Failure(FetchFailure {
            url: url.to_string(),
            depth: 0,
            source: FailedMarker::Failed,
            error: "x".into(),
            last_tier: PageSource::Live,
            crawled_at: chrono::Utc::now(),
        })
    }

    struct OkTransport {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl BulkTransport for OkTransport {
        async fn send(&self, _body: String) -> Result<(), SinkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct SaturatedTransport;

    #[async_trait]
    impl BulkTransport for SaturatedTransport {
        async fn send(&self, _body: String) -> Result<(), SinkError> {
            Err(SinkError::BulkRetryable("http 429".into()))
        }
    }

    fn config(dir: &std::path::Path, chunk_size: usize) -> BulkConfig {
        BulkConfig {
            index: "submarine-scrapes".into(),
            chunk_size,
            deterministic_ids: false,
            max_retries: 5,
            spill_path: dir.join("worker_0.spill.jsonl"),
        }
    }

    #[test]
    fn test_bulk_body_alternates_action_and_doc() {
        let records = vec![record("https://a.example/"), record("https://b.example/")];
        let body = build_bulk_body(&records, "idx", false).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], r#"{"index":{"_index":"idx"}}"#);
        let doc: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(doc["url"], "https://a.example/");
    }

    #[test]
    fn test_bulk_body_deterministic_ids() {
        let records = vec![record("https://a.example/")];
        let body = build_bulk_body(&records, "idx", true).unwrap();
        let action: serde_json::Value = serde_json::from_str(body.lines().next().unwrap()).unwrap();
        let id = action["index"]["_id"].as_str().unwrap();
        assert_eq!(id.len(), 64);
        // Same URL, same id.
        let again = build_bulk_body(&records, "idx", true).unwrap();
        assert_eq!(body, again);
    }

    #[test]
    fn test_bulk_backoff_caps_at_30s() {
        assert_eq!(bulk_backoff(0), Duration::from_secs(1));
        assert_eq!(bulk_backoff(1), Duration::from_secs(2));
        assert_eq!(bulk_backoff(4), Duration::from_secs(16));
        assert_eq!(bulk_backoff(10), Duration::from_secs(30));
    }

    #[test]
    fn test_classify_bulk_status() {
        assert!(classify_bulk_status(200).is_none());
        assert!(matches!(
            classify_bulk_status(429),
            Some(SinkError::BulkRetryable(_))
        ));
        assert!(matches!(
            classify_bulk_status(503),
            Some(SinkError::BulkRetryable(_))
        ));
        assert!(matches!(
            classify_bulk_status(400),
            Some(SinkError::BulkPermanent(_))
        ));
    }

    #[tokio::test]
    async fn test_happy_path_counts_durable() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let sink = BulkIndexSink::new(
            OkTransport {
                calls: Arc::clone(&calls),
            },
            config(dir.path(), 2),
        );
        for i in 0..5 {
            sink.submit(record(&format!("https://example.com/{i}")))
                .await
                .unwrap();
        }
        let stats = sink.close().await.unwrap();
        assert_eq!(stats.accepted, 5);
        assert_eq!(stats.durable, 5);
        assert!(!stats.fell_back);
        // Two full chunks plus the final partial flush.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_saturated_cluster_spills_without_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 2);
        let spill_path = cfg.spill_path.clone();
        let sink = BulkIndexSink::new(SaturatedTransport, cfg);
        for i in 0..4 {
            sink.submit(record(&format!("https://example.com/{i}")))
                .await
                .unwrap();
        }
        let stats = sink.close().await.unwrap();
        assert!(stats.fell_back);
        assert_eq!(stats.accepted, 4);
        assert_eq!(stats.spilled, 4);

        let content = std::fs::read_to_string(&spill_path).unwrap();
        let urls: Vec<String> = content
            .lines()
            .map(|l| {
                serde_json::from_str::<serde_json::Value>(l).unwrap()["url"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/0",
                "https://example.com/1",
                "https://example.com/2",
                "https://example.com/3",
            ]
        );
    }

    #[tokio::test]
    async fn test_submit_after_close_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let sink = BulkIndexSink::new(OkTransport { calls }, config(dir.path(), 2));
        sink.close().await.unwrap();
        let err = sink.submit(record("https://x.example/")).await.unwrap_err();
        assert!(matches!(err, SinkError::Closed));
    }
}
