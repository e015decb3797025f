use thiserror::Error;

/// Per-URL acquisition failures. Split along the two axes the pipeline
/// cares about: retry in-tier (transient) vs escalate to the next tier.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("timeout after {0}s")]
    Timeout(u64),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("connection reset: {0}")]
    Reset(String),

    #[error("tls handshake failed: {0}")]
    Tls(String),

    #[error("http status {0}")]
    Status(u16),

    #[error("body too small: {size} bytes (min {min})")]
    BodyTooSmall { size: usize, min: usize },

    #[error("body too large: {size} bytes (max {max})")]
    BodyTooLarge { size: usize, max: usize },

    #[error("no archive capture for URL")]
    ArchiveMiss,

    #[error("render failed: {0}")]
    Render(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("network error: {0}")]
    Network(String),
}

impl FetchError {
    /// Retried in-tier (up to the driver's retry budget) before the failure
    /// is promoted to a tier transition.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::Reset(_) => true,
            FetchError::Status(429) => true,
            FetchError::Status(s) => (500..600).contains(s),
            FetchError::Network(_) => true,
            _ => false,
        }
    }

    /// 403 is permanent per-URL: never retried, straight to the next tier.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status(s) => Some(*s),
            _ => None,
        }
    }

    /// Short stable label for failure records and completion logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout(_) => "timeout",
            FetchError::Connect(_) => "connect",
            FetchError::Reset(_) => "reset",
            FetchError::Tls(_) => "tls",
            FetchError::Status(404) | FetchError::Status(410) => "not_found",
            FetchError::Status(403) => "forbidden",
            FetchError::Status(429) => "throttled",
            FetchError::Status(s) if (500..600).contains(s) => "server_error",
            FetchError::Status(_) => "http_error",
            FetchError::BodyTooSmall { .. } => "body_too_small",
            FetchError::BodyTooLarge { .. } => "body_too_large",
            FetchError::ArchiveMiss => "archive_miss",
            FetchError::Render(_) => "render",
            FetchError::InvalidUrl(_) => "invalid_url",
            FetchError::Network(_) => "network",
        }
    }
}

/// Sink-side failures.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("bulk submission failed (retryable): {0}")]
    BulkRetryable(String),

    #[error("bulk submission failed permanently: {0}")]
    BulkPermanent(String),

    #[error("sink closed")]
    Closed,

    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Worker-level errors. Nothing below the pipeline level aborts the worker;
/// these surface at startup or when an invariant is violated.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("seed file missing or unreadable: {0}")]
    SeedFileMissing(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classes() {
        assert!(FetchError::Timeout(10).is_transient());
        assert!(FetchError::Status(429).is_transient());
        assert!(FetchError::Status(503).is_transient());
        assert!(FetchError::Reset("peer".into()).is_transient());
    }

    #[test]
    fn test_permanent_classes() {
        assert!(FetchError::Status(404).is_permanent());
        assert!(FetchError::Status(410).is_permanent());
        assert!(FetchError::Status(403).is_permanent());
        assert!(FetchError::Tls("bad cert".into()).is_permanent());
        assert!(FetchError::Connect("refused".into()).is_permanent());
        assert!(FetchError::BodyTooSmall { size: 3, min: 64 }.is_permanent());
    }
}
