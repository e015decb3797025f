use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use dragnet_core::CrawlError;

/// Split a newline-delimited seed file into `n` chunk files whose sizes
/// differ by at most one line. Chunks are materialized on disk so a worker
/// can be restarted against its chunk without rescanning the seed file;
/// given the same (file, n) the split is byte-identical.
pub fn partition(seed_path: &Path, n: usize, chunk_dir: &Path) -> Result<Vec<PathBuf>, CrawlError> {
    if n == 0 {
        return Err(CrawlError::Config("worker count must be at least 1".into()));
    }

    let content = fs::read_to_string(seed_path)
        .map_err(|_| CrawlError::SeedFileMissing(seed_path.display().to_string()))?;
    let seeds: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect();

    fs::create_dir_all(chunk_dir)
        .map_err(|e| CrawlError::Config(format!("cannot create chunk dir: {e}")))?;

    let base = seeds.len() / n;
    let remainder = seeds.len() % n;

    let mut paths = Vec::with_capacity(n);
    let mut cursor = 0usize;
    for i in 0..n {
        let size = base + usize::from(i < remainder);
        let chunk = &seeds[cursor..cursor + size];
        cursor += size;

        let path = chunk_dir.join(format!("chunk_{i:04}.txt"));
        let mut file = fs::File::create(&path)
            .map_err(|e| CrawlError::Config(format!("cannot write chunk: {e}")))?;
        for seed in chunk {
            writeln!(file, "{seed}").map_err(|e| CrawlError::Config(format!("chunk write: {e}")))?;
        }
        paths.push(path);
    }

    info!(
        seeds = seeds.len(),
        chunks = n,
        dir = %chunk_dir.display(),
        "seed file partitioned"
    );
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_seeds(dir: &Path, lines: &[&str]) -> PathBuf {
        let path = dir.join("seeds.txt");
        fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    #[test]
    fn test_sizes_differ_by_at_most_one() {
        let dir = tempfile::tempdir().unwrap();
        let seeds: Vec<String> = (0..10).map(|i| format!("https://site{i}.example/")).collect();
        let seed_refs: Vec<&str> = seeds.iter().map(|s| s.as_str()).collect();
        let seed_path = write_seeds(dir.path(), &seed_refs);

        let chunks = partition(&seed_path, 3, &dir.path().join("chunks")).unwrap();
        assert_eq!(chunks.len(), 3);

        let sizes: Vec<usize> = chunks
            .iter()
            .map(|p| fs::read_to_string(p).unwrap().lines().count())
            .collect();
        assert_eq!(sizes.iter().sum::<usize>(), 10);
        assert_eq!(*sizes.iter().max().unwrap() - *sizes.iter().min().unwrap(), 1);
        assert_eq!(sizes, vec![4, 3, 3]);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let seed_path = write_seeds(dir.path(), &["https://a.example/", "https://b.example/"]);

        let first = partition(&seed_path, 2, &dir.path().join("chunks")).unwrap();
        let contents_a: Vec<String> = first
            .iter()
            .map(|p| fs::read_to_string(p).unwrap())
            .collect();

        let second = partition(&seed_path, 2, &dir.path().join("chunks")).unwrap();
        let contents_b: Vec<String> = second
            .iter()
            .map(|p| fs::read_to_string(p).unwrap())
            .collect();

        assert_eq!(first, second);
        assert_eq!(contents_a, contents_b);
    }

    #[test]
    fn test_blank_lines_and_comments_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let seed_path = write_seeds(
            dir.path(),
            &["https://a.example/", "", "# comment", "  https://b.example/  "],
        );
        let chunks = partition(&seed_path, 1, &dir.path().join("chunks")).unwrap();
        let content = fs::read_to_string(&chunks[0]).unwrap();
        assert_eq!(
            content.lines().collect::<Vec<_>>(),
            vec!["https://a.example/", "https://b.example/"]
        );
    }

    #[test]
    fn test_missing_seed_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = partition(
            &dir.path().join("nope.txt"),
            2,
            &dir.path().join("chunks"),
        )
        .unwrap_err();
        assert!(matches!(err, CrawlError::SeedFileMissing(_)));
    }

    #[test]
    fn test_more_workers_than_seeds() {
        let dir = tempfile::tempdir().unwrap();
        let seed_path = write_seeds(dir.path(), &["https://a.example/"]);
        let chunks = partition(&seed_path, 4, &dir.path().join("chunks")).unwrap();
        assert_eq!(chunks.len(), 4);
        let nonempty = chunks
            .iter()
            .filter(|p| !fs::read_to_string(p).unwrap().is_empty())
            .count();
        assert_eq!(nonempty, 1);
    }
}
