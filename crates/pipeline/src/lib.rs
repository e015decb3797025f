pub mod robots;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use url::Url;

use dragnet_core::{
    AppConfig, CompletionStatus, DomainCompletion, ExtractionTier, FailedMarker, FetchConfig,
    FetchError, FetchResponse, Page, PageSource, Record, UrlOnly, UrlOnlyMarker,
};
use dragnet_extract::Extractor;
use dragnet_fetch::{fetch_with_retries, TierLadder};
use dragnet_frontier::{Frontier, FrontierLimits};
use dragnet_parser::{binary, parse_response, ParseError};
use dragnet_sink::RecordSink;

use robots::RobotsGate;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_pages: u64,
    pub max_depth: u32,
    pub secondary_budget_factor: u64,
    pub allow_subdomains: bool,
    pub respect_robots: bool,
    pub emit_fetch_failures: bool,
    pub include_text: bool,
    pub min_body_bytes: usize,
    pub max_body_size: usize,
    pub user_agent: String,
    /// Archive-record size cap for binary extraction output.
    pub binary_cap: usize,
}

impl PipelineConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_pages: config.general.max_pages,
            max_depth: config.general.max_depth,
            secondary_budget_factor: config.general.secondary_budget_factor,
            allow_subdomains: config.general.allow_subdomains,
            respect_robots: config.general.respect_robots,
            emit_fetch_failures: config.general.emit_fetch_failures,
            include_text: config.general.include_text,
            min_body_bytes: config.general.min_body_bytes,
            max_body_size: config.general.max_body_size_mb * 1024 * 1024,
            user_agent: config.general.user_agent.clone(),
            binary_cap: config.general.max_body_size_mb * 1024 * 1024,
        }
    }
}

/// Live counters the scheduler can read even when it cancels the pipeline
/// on timeout.
#[derive(Debug, Default)]
pub struct PipelineProgress {
    pub pages_emitted: AtomicU64,
    pub urls_seen: AtomicU64,
}

/// One seed domain's crawl: frontier, tier ladder, robots gate, budgets.
/// Owns its pages until they are handed to the sink.
pub struct DomainPipeline {
    seed: Url,
    config: PipelineConfig,
    ladder: Arc<TierLadder>,
    extractor: Arc<Extractor>,
    sink: Arc<dyn RecordSink>,
    progress: Arc<PipelineProgress>,
}

impl DomainPipeline {
    pub fn new(
        seed: Url,
        config: PipelineConfig,
        ladder: Arc<TierLadder>,
        extractor: Arc<Extractor>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        Self {
            seed,
            config,
            ladder,
            extractor,
            sink,
            progress: Arc::new(PipelineProgress::default()),
        }
    }

    pub fn progress(&self) -> Arc<PipelineProgress> {
        Arc::clone(&self.progress)
    }

    pub async fn run(self) -> DomainCompletion {
        let started = Instant::now();
        let seed_str = self.seed.to_string();

        let mut frontier = Frontier::new(
            self.seed.clone(),
            FrontierLimits {
                max_pages: self.config.max_pages,
                max_depth: self.config.max_depth,
                secondary_budget_factor: self.config.secondary_budget_factor,
                allow_subdomains: self.config.allow_subdomains,
            },
        );
        let fetch_config = FetchConfig {
            max_body_size: self.config.max_body_size,
            min_body_bytes: self.config.min_body_bytes,
            user_agent: self.config.user_agent.clone(),
        };
        let mut robots = RobotsGate::new(
            self.config.respect_robots,
            self.config.user_agent.clone(),
        );

        let mut status = CompletionStatus::Completed;

        while let Some(entry) = frontier.pop() {
            self.progress.urls_seen.fetch_add(1, Ordering::Relaxed);

            let tier = self.extractor.classify(&entry.url);
            if tier == ExtractionTier::Skip {
                debug!(url = %entry.url, "classified skip, dropping");
                continue;
            }

            match tier {
                ExtractionTier::Full => {
                    if !frontier.full_budget_left() {
                        debug!(seed = %seed_str, "page budget exhausted, stopping pipeline");
                        break;
                    }
                }
                _ => {
                    if !frontier.aux_budget_left() {
                        continue;
                    }
                }
            }

            // Legacy Office payloads are recognizable from the path alone.
            if binary::is_legacy_office("", entry.url.path()) {
                if self.emit(url_only_record(&entry.url, entry.depth)).await.is_err() {
                    status = CompletionStatus::InternalError;
                    break;
                }
                frontier.record_aux();
                continue;
            }

            if tier == ExtractionTier::UrlOnly {
                if self.emit(url_only_record(&entry.url, entry.depth)).await.is_err() {
                    status = CompletionStatus::InternalError;
                    break;
                }
                frontier.record_aux();
                continue;
            }

            if let Some(first_driver) = self.ladder.drivers().first() {
                if !robots
                    .allowed(&entry.url, first_driver.as_ref(), &fetch_config)
                    .await
                {
                    if entry.depth == 0 {
                        info!(seed = %seed_str, "seed denied by robots.txt");
                        status = CompletionStatus::RobotsDenied;
                        break;
                    }
                    debug!(url = %entry.url, "denied by robots.txt");
                    continue;
                }
            }

            let resp = match self.acquire(&entry.url, &fetch_config).await {
                Ok(resp) => resp,
                Err((error, last_tier)) => {
                    warn!(url = %entry.url, error = %error, last_tier = %last_tier, "all tiers failed");
                    if self.config.emit_fetch_failures {
                        let record = Record::Failure(dragnet_core::FetchFailure {
                            url: entry.url.to_string(),
                            depth: entry.depth,
                            source: FailedMarker::Failed,
                            error: error.kind().to_string(),
                            last_tier,
                            crawled_at: chrono::Utc::now(),
                        });
                        if self.emit(record).await.is_err() {
                            status = CompletionStatus::InternalError;
                            break;
                        }
                    }
                    if entry.depth == 0 {
                        status = CompletionStatus::DomainUnreachable;
                        break;
                    }
                    continue;
                }
            };

            let parsed = match parse_response(&resp, self.config.binary_cap) {
                Ok(parsed) => parsed,
                Err(ParseError::BinaryUnsupported) => {
                    debug!(url = %entry.url, "unsupported binary, recording URL only");
                    if self.emit(url_only_record(&entry.url, entry.depth)).await.is_err() {
                        status = CompletionStatus::InternalError;
                        break;
                    }
                    frontier.record_aux();
                    continue;
                }
                Err(ParseError::MalformedPayload(msg)) => {
                    warn!(url = %entry.url, error = %msg, "malformed payload, emitting bare record");
                    let page = self.build_page(entry.depth, &resp, None, None);
                    if self.emit(Record::Page(Box::new(page))).await.is_err() {
                        status = CompletionStatus::InternalError;
                        break;
                    }
                    self.progress.pages_emitted.fetch_add(1, Ordering::Relaxed);
                    frontier.record_full();
                    continue;
                }
            };

            let extraction = parsed
                .text
                .as_deref()
                .map(|text| self.extractor.extract(&resp.final_url, text, &parsed.links));

            let page = self.build_page(entry.depth, &resp, Some(&parsed), extraction.as_ref());
            if self.emit(Record::Page(Box::new(page))).await.is_err() {
                status = CompletionStatus::InternalError;
                break;
            }
            self.progress.pages_emitted.fetch_add(1, Ordering::Relaxed);

            match tier {
                ExtractionTier::Full => frontier.record_full(),
                _ => frontier.record_aux(),
            }

            // Link following: FULL pages only, and never past max_depth.
            if tier == ExtractionTier::Full && entry.depth < self.config.max_depth {
                let next_depth = entry.depth + 1;
                let mut enqueued = 0usize;
                for link in &parsed.links {
                    if frontier.offer(&link.href, next_depth, &entry.url) {
                        enqueued += 1;
                    }
                }
                if enqueued > 0 {
                    debug!(url = %entry.url, enqueued, "internal links enqueued");
                }
            }
        }

        DomainCompletion {
            seed: seed_str,
            status,
            pages_emitted: self.progress.pages_emitted.load(Ordering::Relaxed),
            urls_seen: self.progress.urls_seen.load(Ordering::Relaxed),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Walk the tier ladder. In-tier transient retries happen inside
    /// `fetch_with_retries`; any terminal failure moves to the next tier.
    /// Suspiciously tiny bodies escalate too.
    async fn acquire(
        &self,
        url: &Url,
        fetch_config: &FetchConfig,
    ) -> Result<FetchResponse, (FetchError, PageSource)> {
        let mut last: Option<(FetchError, PageSource)> = None;

        for driver in self.ladder.drivers() {
            match fetch_with_retries(driver.as_ref(), url, fetch_config).await {
                Ok(resp) => {
                    if resp.body.len() < fetch_config.min_body_bytes {
                        debug!(
                            url = %url,
                            tier = %driver.source(),
                            len = resp.body.len(),
                            "body below plausibility floor, escalating"
                        );
                        last = Some((
                            FetchError::BodyTooSmall {
                                size: resp.body.len(),
                                min: fetch_config.min_body_bytes,
                            },
                            driver.source(),
                        ));
                        continue;
                    }
                    return Ok(resp);
                }
                Err(e) => {
                    debug!(url = %url, tier = %driver.source(), error = %e, "tier failed");
                    last = Some((e, driver.source()));
                }
            }
        }

        Err(last.unwrap_or((
            FetchError::Network("no fetch tiers configured".into()),
            PageSource::Live,
        )))
    }

    fn build_page(
        &self,
        depth: u32,
        resp: &FetchResponse,
        parsed: Option<&dragnet_parser::ParsedPage>,
        extraction: Option<&dragnet_extract::Extraction>,
    ) -> Page {
        let content_type = resp
            .content_type_str()
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_string();

        let text = parsed.and_then(|p| {
            if self.config.include_text {
                p.text.clone()
            } else {
                None
            }
        });

        Page {
            url: resp.final_url.to_string(),
            depth,
            source: resp.source,
            http_status: resp.status,
            content_type,
            len: resp.body.len(),
            title: parsed.and_then(|p| p.title.clone()),
            meta_description: parsed.and_then(|p| p.meta_description.clone()),
            text,
            internal_links: extraction.map(|e| e.internal_links).unwrap_or(0),
            outlinks: extraction.map(|e| e.outlinks.clone()).unwrap_or_default(),
            entities: extraction.map(|e| e.entities.clone()).unwrap_or_default(),
            companies: extraction.map(|e| e.companies.clone()).unwrap_or_default(),
            tripwires: extraction.map(|e| e.tripwires.clone()).unwrap_or_default(),
            binary_metadata: parsed.map(|p| p.binary_metadata.clone()).unwrap_or_default(),
            partial_extraction: parsed.map(|p| p.partial_extraction).unwrap_or(false),
            content_hash: parsed.map(|p| p.content_hash.clone()).unwrap_or_default(),
            crawled_at: resp.fetched_at,
        }
    }

    async fn emit(&self, record: Record) -> Result<(), ()> {
        match self.sink.submit(record).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(seed = %self.seed, error = %e, "sink rejected record");
                Err(())
            }
        }
    }
}

fn url_only_record(url: &Url, depth: u32) -> Record {
    Record::UrlOnly(UrlOnly {
        url: url.to_string(),
        depth,
        source: UrlOnlyMarker::UrlOnly,
        crawled_at: chrono::Utc::now(),
    })
}
