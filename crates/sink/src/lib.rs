pub mod file;
pub mod index;

use async_trait::async_trait;

use dragnet_core::{Record, SinkError};

pub use file::JsonlSink;
pub use index::{BulkConfig, BulkIndexSink, BulkTransport, HttpBulkTransport};

/// Where records go once a pipeline is done with them. `submit` may await
/// (bounded queue); once it returns, the record is the sink's problem and
/// will eventually be durable or spilled.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn submit(&self, record: Record) -> Result<(), SinkError>;

    /// Flush everything and return final accounting. Idempotent submit
    /// attempts after close fail with `Closed`.
    async fn close(&self) -> Result<SinkStats, SinkError>;
}

#[derive(Debug, Default, Clone)]
pub struct SinkStats {
    /// Records accepted from pipelines.
    pub accepted: u64,
    /// Records known written: indexed or spilled to file.
    pub durable: u64,
    /// Subset of durable that went to the spill file after fallback.
    pub spilled: u64,
    /// Whether index mode degraded to file mode during the run.
    pub fell_back: bool,
}
