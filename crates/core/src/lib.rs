pub mod config;
pub mod error;
pub mod record;
pub mod types;

pub use config::AppConfig;
pub use error::{CrawlError, FetchError, SinkError};
pub use record::*;
pub use types::*;
