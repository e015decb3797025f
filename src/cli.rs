use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Crawler entry point. One process is one worker; an external supervisor
/// launches N of these against the same seed file with distinct
/// `--worker-id` values.
#[derive(Parser, Debug)]
#[command(name = "dragnet", about = "Archive-backed web crawler & entity extraction pipeline")]
pub struct Cli {
    /// Seed file (newline-delimited URLs).
    pub seeds: PathBuf,

    /// Path to config file.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Per-domain page budget [default: 50].
    #[arg(long)]
    pub max_pages: Option<u64>,

    /// Per-domain link-follow depth [default: 2].
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// Concurrent domain pipelines per worker [default: 20].
    #[arg(long)]
    pub concurrent: Option<usize>,

    /// Force file-mode sink (per-worker JSONL instead of bulk indexing).
    #[arg(long)]
    pub no_index: bool,

    /// Target index name in index mode [default: submarine-scrapes].
    #[arg(long)]
    pub es_index: Option<String>,

    /// Search-cluster host [default: localhost].
    #[arg(long)]
    pub es_host: Option<String>,

    /// Search-cluster port [default: 9200].
    #[arg(long)]
    pub es_port: Option<u16>,

    /// Follow links to sibling subdomains of the seed's registrable domain.
    #[arg(long)]
    pub allow_subdomains: bool,

    /// Honor robots.txt [default: true].
    #[arg(long, action = ArgAction::Set, value_name = "BOOL")]
    pub respect_robots: Option<bool>,

    /// Numeric identifier used in output file naming.
    #[arg(long, default_value_t = 0)]
    pub worker_id: usize,

    /// Number of chunks the seed file is partitioned into.
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// Output/chunk directory [default: from config].
    #[arg(long)]
    pub data_dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["dragnet", "seeds.txt"]);
        assert_eq!(cli.seeds, PathBuf::from("seeds.txt"));
        assert_eq!(cli.worker_id, 0);
        assert_eq!(cli.workers, 1);
        assert!(!cli.no_index);
        assert!(cli.max_pages.is_none());
        assert!(cli.respect_robots.is_none());
    }

    #[test]
    fn test_flag_overrides() {
        let cli = Cli::parse_from([
            "dragnet",
            "seeds.txt",
            "--max-pages",
            "10",
            "--concurrent",
            "5",
            "--no-index",
            "--respect-robots",
            "false",
            "--worker-id",
            "3",
            "--workers",
            "8",
        ]);
        assert_eq!(cli.max_pages, Some(10));
        assert_eq!(cli.concurrent, Some(5));
        assert!(cli.no_index);
        assert_eq!(cli.respect_robots, Some(false));
        assert_eq!(cli.worker_id, 3);
        assert_eq!(cli.workers, 8);
    }
}
