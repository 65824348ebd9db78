pub mod cli;
pub mod config;
pub mod crawler;
pub mod logging;
pub mod models;
pub mod network;
pub mod paginator;
pub mod query;
pub mod shards;
pub mod snapshot;

// Re-export main types for library usage
pub use config::Config;
pub use crawler::{run_crawl, CrawlError, CrawlOptions, CrawlSummary, ShardReport};
pub use models::{DocumentRecord, FieldValue, MalformedDocumentError};
pub use network::{FetchError, PageFetcher, RetrySchedule, SolrClient, SolrPage};
pub use paginator::{CrawlProgress, ShardPaginator, ShardUnavailableError};
pub use query::QuerySpec;
pub use shards::{load_shards, parse_whitelist, ConfigError, ShardEndpoint};
pub use snapshot::SnapshotWriter;
