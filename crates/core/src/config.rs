use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub tier_a: TierConfig,
    pub tier_b: TierConfig,
    pub tier_c: TierConfig,
    pub tier_d: TierConfig,
    pub sink: SinkConfig,
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    pub data_dir: String,
    pub max_pages: u64,
    pub max_depth: u32,
    #[serde(default = "default_secondary_budget_factor")]
    pub secondary_budget_factor: u64,
    pub max_body_size_mb: usize,
    #[serde(default = "default_min_body_bytes")]
    pub min_body_bytes: usize,
    #[serde(default)]
    pub allow_subdomains: bool,
    #[serde(default = "default_true")]
    pub respect_robots: bool,
    #[serde(default = "default_true")]
    pub emit_fetch_failures: bool,
    #[serde(default = "default_true")]
    pub include_text: bool,
    #[serde(default = "default_pipeline_timeout")]
    pub pipeline_timeout_seconds: u64,
    #[serde(default = "default_concurrent_domains")]
    pub concurrent_domains: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// One fetch tier's knobs. Tiers A-D differ in cost, so each carries its
/// own concurrency ceiling and request timeout.
#[derive(Debug, Deserialize, Clone)]
pub struct TierConfig {
    pub enabled: bool,
    pub concurrency: usize,
    pub timeout_seconds: u64,
    #[serde(default = "default_tier_retries")]
    pub retries: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SinkConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_flush_every")]
    pub flush_every: usize,
    #[serde(default = "default_es_index")]
    pub es_index: String,
    #[serde(default = "default_es_host")]
    pub es_host: String,
    #[serde(default = "default_es_port")]
    pub es_port: u16,
    /// When set, bulk documents carry `_id` = sha256(url) so reindexing is
    /// deterministic.
    #[serde(default)]
    pub deterministic_ids: bool,
    #[serde(default = "default_bulk_retries")]
    pub bulk_retries: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    #[serde(default = "default_max_content_scan")]
    pub max_content_scan: usize,
    #[serde(default = "default_max_persons")]
    pub max_persons: usize,
    #[serde(default = "default_max_companies")]
    pub max_companies: usize,
    #[serde(default = "default_max_outlinks")]
    pub max_outlinks: usize,
    #[serde(default = "default_person_threshold")]
    pub person_threshold: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_content_scan: default_max_content_scan(),
            max_persons: default_max_persons(),
            max_companies: default_max_companies(),
            max_outlinks: default_max_outlinks(),
            person_threshold: default_person_threshold(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_secondary_budget_factor() -> u64 {
    4
}
fn default_min_body_bytes() -> usize {
    64
}
fn default_pipeline_timeout() -> u64 {
    120
}
fn default_concurrent_domains() -> usize {
    20
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; rv:128.0) Gecko/20100101 Firefox/128.0".to_string()
}
fn default_tier_retries() -> u32 {
    2
}
fn default_chunk_size() -> usize {
    500
}
fn default_flush_every() -> usize {
    100
}
fn default_es_index() -> String {
    "submarine-scrapes".to_string()
}
fn default_es_host() -> String {
    "localhost".to_string()
}
fn default_es_port() -> u16 {
    9200
}
fn default_bulk_retries() -> u32 {
    5
}
fn default_max_content_scan() -> usize {
    100_000
}
fn default_max_persons() -> usize {
    30
}
fn default_max_companies() -> usize {
    20
}
fn default_max_outlinks() -> usize {
    300
}
fn default_person_threshold() -> f64 {
    0.6
}
