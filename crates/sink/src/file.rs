use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::info;

use dragnet_core::{Record, SinkError};

use crate::{RecordSink, SinkStats};

/// Append-only JSONL sink. One record per line; lines are written whole, so
/// a reader never sees a partial record. Flushes every `flush_every`
/// records and on close.
pub struct JsonlSink {
    path: PathBuf,
    flush_every: usize,
    inner: Mutex<Inner>,
}

struct Inner {
    writer: Option<BufWriter<File>>,
    since_flush: usize,
    accepted: u64,
}

impl JsonlSink {
    pub async fn open(path: impl AsRef<Path>, flush_every: usize) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        info!(path = %path.display(), "jsonl sink open");
        Ok(Self {
            path,
            flush_every: flush_every.max(1),
            inner: Mutex::new(Inner {
                writer: Some(BufWriter::new(file)),
                since_flush: 0,
                accepted: 0,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSink for JsonlSink {
    async fn submit(&self, record: Record) -> Result<(), SinkError> {
        let line = serde_json::to_string(&record)?;
        let mut inner = self.inner.lock().await;
        let Some(writer) = inner.writer.as_mut() else {
            return Err(SinkError::Closed);
        };
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        inner.accepted += 1;
        inner.since_flush += 1;
        if inner.since_flush >= self.flush_every {
            if let Some(writer) = inner.writer.as_mut() {
                writer.flush().await?;
            }
            inner.since_flush = 0;
        }
        Ok(())
    }

    async fn close(&self) -> Result<SinkStats, SinkError> {
        let mut inner = self.inner.lock().await;
        if let Some(mut writer) = inner.writer.take() {
            writer.flush().await?;
        }
        Ok(SinkStats {
            accepted: inner.accepted,
            durable: inner.accepted,
            spilled: 0,
            fell_back: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dragnet_core::{FailedMarker, FetchFailure, PageSource};

    fn failure(url: &str) -> Record {
        Record::Failure(FetchFailure {
            url: url.to_string(),
            depth: 0,
            source: FailedMarker::Failed,
            error: "connect".into(),
            last_tier: PageSource::Render,
            crawled_at: chrono::Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_lines_match_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worker_0.jsonl");
        let sink = JsonlSink::open(&path, 100).await.unwrap();
        for i in 0..7 {
            sink.submit(failure(&format!("https://example.com/{i}")))
                .await
                .unwrap();
        }
        let stats = sink.close().await.unwrap();
        assert_eq!(stats.accepted, 7);
        assert_eq!(stats.durable, 7);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 7);
        for line in lines {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(parsed["url"].as_str().unwrap().starts_with("https://"));
        }
    }

    #[tokio::test]
    async fn test_flush_cadence_makes_lines_visible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worker_1.jsonl");
        let sink = JsonlSink::open(&path, 2).await.unwrap();
        sink.submit(failure("https://a.example/")).await.unwrap();
        sink.submit(failure("https://b.example/")).await.unwrap();
        // Two submits hit the flush threshold; both lines are on disk
        // before close.
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        sink.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_after_close_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::open(dir.path().join("w.jsonl"), 10).await.unwrap();
        sink.close().await.unwrap();
        let err = sink.submit(failure("https://x.example/")).await.unwrap_err();
        assert!(matches!(err, SinkError::Closed));
    }

    #[tokio::test]
    async fn test_append_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.jsonl");
        {
            let sink = JsonlSink::open(&path, 10).await.unwrap();
            sink.submit(failure("https://a.example/")).await.unwrap();
            sink.close().await.unwrap();
        }
        {
            let sink = JsonlSink::open(&path, 10).await.unwrap();
            sink.submit(failure("https://b.example/")).await.unwrap();
            sink.close().await.unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
