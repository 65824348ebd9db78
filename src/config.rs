// Global configuration constants - single source of truth

pub struct Config;

impl Config {
    /// Fields extracted for every dataset-version document, in dump order.
    pub const DUMP_FIELDS: [&'static str; 6] = [
        "instance_id",
        "data_node",
        "index_node",
        "size",
        "replica",
        "timestamp",
    ];

    /// SOLR collection holding dataset documents.
    pub const SOLR_CORE: &'static str = "datasets";

    /// Rows requested per page.
    pub const PAGE_SIZE: usize = 500;

    // Shard directory
    pub const SHARDS_XML: &'static str = "/esg/config/esgf_shards_static.xml";
    pub const WHITELIST_NS: &'static str = "http://www.esgf.org/whitelist";

    // HTTP/Network config
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;
    pub const POOL_IDLE_PER_HOST: usize = 4;
    pub const MAX_RETRIES: u32 = 2;
    pub const BACKOFF_BASE_MS: u64 = 500;
    pub const BACKOFF_MAX_MS: u64 = 30_000;

    // Worker pool
    pub const WORKERS: usize = 4;
}
