mod cli;
mod crawl;
mod partition;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, warn};

// Use mimalloc to prevent memory bloat (glibc malloc doesn't release memory
// with high concurrency).
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use dragnet_core::{AppConfig, CrawlError};

use crate::cli::Cli;
use crate::crawl::run_worker;

// Exit codes: 0 normal, 2 seed file missing, 3 configuration error,
// 4 persistent sink failure after fallback, 5 internal error threshold.
const EXIT_OK: u8 = 0;
const EXIT_SEED_MISSING: u8 = 2;
const EXIT_CONFIG: u8 = 3;
const EXIT_SINK_FALLBACK: u8 = 4;
const EXIT_ERROR_THRESHOLD: u8 = 5;

fn main() -> ExitCode {
    // Custom runtime: tier-A fan-out plus blocking render tasks want more
    // headroom than the defaults.
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(16)
        .thread_stack_size(8 * 1024 * 1024)
        .max_blocking_threads(64)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to build runtime: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    ExitCode::from(runtime.block_on(async_main()))
}

async fn async_main() -> u8 {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config: AppConfig = match toml::from_str(&config_str) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "config file invalid");
            return EXIT_CONFIG;
        }
    };

    apply_overrides(&mut config, &cli);

    if cli.worker_id >= cli.workers {
        error!(
            worker_id = cli.worker_id,
            workers = cli.workers,
            "worker id out of range"
        );
        return EXIT_CONFIG;
    }

    let chunk_dir = Path::new(&config.general.data_dir).join("chunks");
    let chunks = match partition::partition(&cli.seeds, cli.workers, &chunk_dir) {
        Ok(chunks) => chunks,
        Err(CrawlError::SeedFileMissing(path)) => {
            error!(path, "seed file missing or unreadable");
            return EXIT_SEED_MISSING;
        }
        Err(e) => {
            error!(error = %e, "partitioning failed");
            return EXIT_CONFIG;
        }
    };

    let chunk = chunks[cli.worker_id].clone();
    match run_worker(config, &chunk, cli.worker_id, cli.no_index).await {
        Ok(summary) if summary.error_threshold_exceeded => EXIT_ERROR_THRESHOLD,
        Ok(summary) if summary.sink.fell_back => EXIT_SINK_FALLBACK,
        Ok(_) => EXIT_OK,
        Err(e) => {
            error!(error = %e, "worker failed");
            EXIT_CONFIG
        }
    }
}

/// CLI flags win over the config file; USER_AGENT wins over both.
/// HTTP_PROXY/HTTPS_PROXY are honored by the HTTP client itself.
fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(max_pages) = cli.max_pages {
        config.general.max_pages = max_pages;
    }
    if let Some(max_depth) = cli.max_depth {
        config.general.max_depth = max_depth;
    }
    if let Some(concurrent) = cli.concurrent {
        config.general.concurrent_domains = concurrent;
    }
    if let Some(respect_robots) = cli.respect_robots {
        config.general.respect_robots = respect_robots;
    }
    if cli.allow_subdomains {
        config.general.allow_subdomains = true;
    }
    if let Some(es_index) = &cli.es_index {
        config.sink.es_index = es_index.clone();
    }
    if let Some(es_host) = &cli.es_host {
        config.sink.es_host = es_host.clone();
    }
    if let Some(es_port) = cli.es_port {
        config.sink.es_port = es_port;
    }
    if let Some(data_dir) = &cli.data_dir {
        config.general.data_dir = data_dir.clone();
    }
    if let Ok(user_agent) = std::env::var("USER_AGENT") {
        if !user_agent.is_empty() {
            config.general.user_agent = user_agent;
        }
    }
}
