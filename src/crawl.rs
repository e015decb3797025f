use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use dashmap::DashSet;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use url::Url;

use dragnet_core::{AppConfig, CompletionStatus, DomainCompletion};
use dragnet_extract::Extractor;
use dragnet_fetch::{build_http_client, TierLadder};
use dragnet_frontier::registrable_domain;
use dragnet_pipeline::{DomainPipeline, PipelineConfig};
use dragnet_sink::{BulkConfig, BulkIndexSink, HttpBulkTransport, JsonlSink, RecordSink, SinkStats};

/// InternalError completions tolerated inside the sliding window before the
/// worker gives up and exits for the supervisor to restart it.
const ERROR_THRESHOLD: usize = 30;
const ERROR_WINDOW: Duration = Duration::from_secs(300);

/// Sliding-window counter over internal-error timestamps.
pub struct ErrorWindow {
    window: Duration,
    threshold: usize,
    hits: VecDeque<Instant>,
}

impl ErrorWindow {
    pub fn new(threshold: usize, window: Duration) -> Self {
        Self {
            window,
            threshold,
            hits: VecDeque::new(),
        }
    }

    /// Record one error; true when the threshold is now exceeded.
    pub fn record(&mut self) -> bool {
        let now = Instant::now();
        self.hits.push_back(now);
        while let Some(front) = self.hits.front() {
            if now.duration_since(*front) > self.window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
        self.hits.len() >= self.threshold
    }
}

#[derive(Debug, Default)]
pub struct WorkerSummary {
    pub seeds_processed: u64,
    pub completed: u64,
    pub unreachable: u64,
    pub robots_denied: u64,
    pub timeouts: u64,
    pub internal_errors: u64,
    pub error_threshold_exceeded: bool,
    pub sink: SinkStats,
}

/// Run one worker against its chunk: cohorts of exactly K domain pipelines,
/// awaited as a unit, no cross-batch overlap. Pipeline failures never kill
/// the worker; each seed yields exactly one completion line.
pub async fn run_worker(
    config: AppConfig,
    chunk_path: &Path,
    worker_id: usize,
    no_index: bool,
) -> Result<WorkerSummary> {
    let seeds = load_seeds(chunk_path)?;
    info!(worker_id, seeds = seeds.len(), chunk = %chunk_path.display(), "worker starting");

    let client = build_http_client(&config.general.user_agent, config.tier_a.concurrency)?;
    let ladder = Arc::new(TierLadder::from_config(&config, client.clone()));
    if ladder.is_empty() {
        anyhow::bail!("no fetch tiers enabled");
    }
    let extractor = Arc::new(Extractor::new(config.extraction.clone()));
    let pipeline_config = PipelineConfig::from_app_config(&config);
    let pipeline_timeout = Duration::from_secs(config.general.pipeline_timeout_seconds);

    let data_dir = Path::new(&config.general.data_dir);
    let sink: Arc<dyn RecordSink> = if no_index {
        Arc::new(
            JsonlSink::open(
                data_dir.join(format!("worker_{worker_id}.jsonl")),
                config.sink.flush_every,
            )
            .await?,
        )
    } else {
        let transport =
            HttpBulkTransport::new(client, &config.sink.es_host, config.sink.es_port);
        Arc::new(BulkIndexSink::new(
            transport,
            BulkConfig {
                index: config.sink.es_index.clone(),
                chunk_size: config.sink.chunk_size,
                deterministic_ids: config.sink.deterministic_ids,
                max_retries: config.sink.bulk_retries,
                spill_path: data_dir.join(format!("worker_{worker_id}.spill.jsonl")),
            },
        ))
    };

    // Seed lists repeat registrable domains (www vs bare, multiple paths);
    // one pipeline per domain per worker run.
    let seen_domains: Arc<DashSet<String>> = Arc::new(DashSet::new());

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received, finishing current cohort");
                shutdown.store(true, Ordering::SeqCst);
            }
        });
    }

    let mut summary = WorkerSummary::default();
    let mut error_window = ErrorWindow::new(ERROR_THRESHOLD, ERROR_WINDOW);
    let concurrency = config.general.concurrent_domains.max(1);

    'batches: for batch in seeds.chunks(concurrency) {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        let mut cohort: JoinSet<DomainCompletion> = JoinSet::new();
        for seed in batch {
            let Some(host) = seed.host_str() else {
                warn!(seed = %seed, "seed has no host, skipped");
                continue;
            };
            if !seen_domains.insert(registrable_domain(host)) {
                info!(seed = %seed, "duplicate registrable domain in chunk, skipped");
                continue;
            }

            let pipeline = DomainPipeline::new(
                seed.clone(),
                pipeline_config.clone(),
                Arc::clone(&ladder),
                Arc::clone(&extractor),
                Arc::clone(&sink),
            );
            let progress = pipeline.progress();
            let seed_str = seed.to_string();
            cohort.spawn(async move {
                match tokio::time::timeout(pipeline_timeout, pipeline.run()).await {
                    Ok(completion) => completion,
                    // Cooperative cancel: in-flight fetches are dropped,
                    // records already submitted stay submitted.
                    Err(_) => DomainCompletion {
                        seed: seed_str,
                        status: CompletionStatus::PartialTimeout,
                        pages_emitted: progress.pages_emitted.load(Ordering::Relaxed),
                        urls_seen: progress.urls_seen.load(Ordering::Relaxed),
                        duration_ms: pipeline_timeout.as_millis() as u64,
                    },
                }
            });
        }

        // Gather with exceptions: a panicked pipeline is an internal error,
        // not a dead cohort.
        while let Some(joined) = cohort.join_next().await {
            let completion = match joined {
                Ok(completion) => completion,
                Err(join_err) => {
                    error!(worker_id, error = %join_err, "pipeline task failed");
                    summary.internal_errors += 1;
                    summary.seeds_processed += 1;
                    if error_window.record() {
                        summary.error_threshold_exceeded = true;
                    }
                    continue;
                }
            };

            summary.seeds_processed += 1;
            info!(
                worker_id,
                seed = %completion.seed,
                status = completion.status.as_str(),
                pages = completion.pages_emitted,
                urls = completion.urls_seen,
                duration_ms = completion.duration_ms,
                "domain completed"
            );
            match completion.status {
                CompletionStatus::Completed => summary.completed += 1,
                CompletionStatus::DomainUnreachable => summary.unreachable += 1,
                CompletionStatus::RobotsDenied => summary.robots_denied += 1,
                CompletionStatus::PartialTimeout => summary.timeouts += 1,
                CompletionStatus::InternalError => {
                    summary.internal_errors += 1;
                    if error_window.record() {
                        summary.error_threshold_exceeded = true;
                    }
                }
            }
        }

        if summary.error_threshold_exceeded {
            error!(
                worker_id,
                internal_errors = summary.internal_errors,
                "internal error threshold exceeded, worker exiting for restart"
            );
            break 'batches;
        }
    }

    summary.sink = sink.close().await?;
    info!(
        worker_id,
        seeds = summary.seeds_processed,
        completed = summary.completed,
        unreachable = summary.unreachable,
        robots_denied = summary.robots_denied,
        timeouts = summary.timeouts,
        internal_errors = summary.internal_errors,
        records_accepted = summary.sink.accepted,
        records_durable = summary.sink.durable,
        records_spilled = summary.sink.spilled,
        sink_fell_back = summary.sink.fell_back,
        "worker finished"
    );
    Ok(summary)
}

fn load_seeds(chunk_path: &Path) -> Result<Vec<Url>> {
    let content = std::fs::read_to_string(chunk_path)?;
    let mut seeds = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        // Bare domains are tolerated; scheme defaults to https.
        let candidate = if line.contains("://") {
            line.to_string()
        } else {
            format!("https://{line}")
        };
        match Url::parse(&candidate) {
            Ok(url) => seeds.push(url),
            Err(e) => warn!(line, error = %e, "unparseable seed, skipped"),
        }
    }
    Ok(seeds)
}
