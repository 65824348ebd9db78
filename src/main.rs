use clap::Parser;
use esgf_snapshot::cli::Cli;
use esgf_snapshot::crawler::{run_crawl, CrawlError, CrawlOptions, CrawlSummary};
use esgf_snapshot::logging;
use esgf_snapshot::network::{RetrySchedule, SolrClient};
use esgf_snapshot::query::QuerySpec;
use esgf_snapshot::shards::{load_shards, ConfigError};
use esgf_snapshot::snapshot::SnapshotWriter;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
enum MainError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("crawl failed: {0}")]
    Crawl(#[from] CrawlError),
}

impl MainError {
    fn exit_code(&self) -> i32 {
        match self {
            MainError::Config(_) | MainError::Io(_) => 3,
            MainError::Crawl(_) => 4,
        }
    }
}

#[tokio::main]
async fn main() {
    logging::init();
    let cli = Cli::parse();

    // Batches are flushed to the snapshot as they arrive, so an interrupt
    // leaves a truncated but well-formed file behind.
    tokio::select! {
        result = run(cli) => match result {
            Ok(summary) => {
                report_summary(&summary);
                if summary.failed_shards() > 0 {
                    // Partial coverage still exits non-zero so operators notice.
                    std::process::exit(4);
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(e.exit_code());
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted, partial snapshot kept");
            std::process::exit(130);
        }
    }
}

async fn run(cli: Cli) -> Result<CrawlSummary, MainError> {
    let shards = if cli.shards.is_empty() {
        load_shards(&cli.shards_file)?
    } else {
        // Fixed override list for controlled runs; the whitelist is not read.
        cli.shards.clone()
    };
    tracing::info!(
        project = %cli.project,
        shards = shards.len(),
        output = %cli.output.display(),
        "starting catalog crawl"
    );

    let spec = QuerySpec::new(&cli.project).with_page_size(cli.page_size);
    let fetcher = Arc::new(SolrClient::with_retry(
        cli.timeout,
        RetrySchedule::new(cli.max_retries, cli.backoff_base_ms, cli.backoff_max_ms),
    ));
    let options = CrawlOptions {
        workers: cli.workers,
        fail_fast: cli.fail_fast,
    };

    let mut writer = SnapshotWriter::create(&cli.output, &spec.fields)?;
    let result = run_crawl(shards, spec, fetcher, &mut writer, &options).await;
    // Finalize the sink either way: a partial snapshot is still usable.
    writer.into_inner()?;

    Ok(result?)
}

fn report_summary(summary: &CrawlSummary) {
    for report in &summary.shards {
        match &report.error {
            None => tracing::info!(
                shard = %report.shard,
                records = report.records_emitted,
                total_found = report.total_found,
                malformed_skipped = report.malformed_skipped,
                "shard complete"
            ),
            Some(error) => tracing::warn!(
                shard = %report.shard,
                records = report.records_emitted,
                %error,
                "shard failed"
            ),
        }
    }

    eprintln!(
        "Crawled {}/{} shards, {} records written{}",
        summary.shards_completed,
        summary.shards_attempted,
        summary.total_records_emitted,
        if summary.failed_shards() > 0 {
            " (partial: some shards failed)"
        } else {
            ""
        }
    );
}
