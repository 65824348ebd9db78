use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// CLI entry point for snapshotting the federated catalog.
/// Exit codes: 0=success, 2=invalid arguments, 3=I/O or config error, 4=crawl failure
#[derive(Parser, Debug)]
#[command(name = "esgf-snapshot")]
#[command(about = "Crawl federated SOLR index shards and snapshot dataset catalog records")]
#[command(version)]
pub struct Cli {
    #[arg(help = "Project to query, e.g. CMIP5")]
    pub project: String,

    #[arg(help = "Path of the snapshot file to write")]
    pub output: PathBuf,

    #[arg(
        long,
        default_value = Config::SHARDS_XML,
        help = "XML whitelist naming the index shards to crawl"
    )]
    pub shards_file: PathBuf,

    #[arg(
        long = "shard",
        value_name = "HOST:PORT/PATH",
        help = "Crawl this shard instead of the whitelist (repeatable, for controlled runs)"
    )]
    pub shards: Vec<String>,

    #[arg(
        long,
        default_value_t = Config::PAGE_SIZE,
        help = "Rows requested per page"
    )]
    pub page_size: usize,

    #[arg(
        short,
        long,
        default_value_t = Config::WORKERS,
        help = "Shards crawled concurrently (1 = strictly sequential)"
    )]
    pub workers: usize,

    #[arg(
        short,
        long,
        default_value_t = Config::REQUEST_TIMEOUT_SECS,
        help = "Per-request timeout in seconds"
    )]
    pub timeout: u64,

    #[arg(
        long,
        default_value_t = Config::MAX_RETRIES,
        help = "Retries per page fetch before the shard is declared unavailable"
    )]
    pub max_retries: u32,

    #[arg(
        long,
        default_value_t = Config::BACKOFF_BASE_MS,
        help = "Base retry backoff delay in milliseconds"
    )]
    pub backoff_base_ms: u64,

    #[arg(
        long,
        default_value_t = Config::BACKOFF_MAX_MS,
        help = "Maximum retry backoff delay in milliseconds"
    )]
    pub backoff_max_ms: u64,

    #[arg(
        long,
        help = "Abort the whole run on the first shard failure instead of continuing"
    )]
    pub fail_fast: bool,
}
