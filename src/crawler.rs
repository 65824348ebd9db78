//! Crawl orchestrator: drives one paginator per shard through a bounded
//! worker pool and serializes every record into the snapshot sink.

use crate::models::DocumentRecord;
use crate::network::PageFetcher;
use crate::paginator::{ShardPaginator, ShardUnavailableError};
use crate::query::QuerySpec;
use crate::snapshot::SnapshotWriter;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Tuning knobs for one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Maximum shards crawled concurrently; 1 reproduces a strictly
    /// sequential crawl.
    pub workers: usize,
    /// Abort the whole run on the first shard failure instead of recording
    /// it and continuing with the remaining shards.
    pub fail_fast: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            workers: crate::config::Config::WORKERS,
            fail_fast: false,
        }
    }
}

/// Outcome of crawling one shard.
#[derive(Debug, Clone)]
pub struct ShardReport {
    pub shard: String,
    /// Total reported by the shard on its first response; 0 if it was never
    /// reached.
    pub total_found: u64,
    pub records_emitted: u64,
    pub malformed_skipped: u64,
    /// Set when the shard failed part-way; earlier records are still in the
    /// snapshot.
    pub error: Option<String>,
}

/// What the whole run produced, accumulated explicitly by the orchestrator
/// and returned to the caller.
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    pub shards_attempted: usize,
    pub shards_completed: usize,
    pub total_records_emitted: u64,
    pub shards: Vec<ShardReport>,
}

impl CrawlSummary {
    pub fn failed_shards(&self) -> usize {
        self.shards_attempted - self.shards_completed
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("failed to write snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Shard(#[from] ShardUnavailableError),
}

/// Messages from shard workers to the single writer loop. Batches from one
/// shard arrive in page order because each shard is driven by one task.
enum ShardEvent {
    Batch(Vec<DocumentRecord>),
    Finished {
        index: usize,
        report: ShardReport,
        error: Option<ShardUnavailableError>,
    },
}

/// Crawl every shard and write one line per document to the sink.
///
/// Shards are crawled by a pool of up to `options.workers` concurrent tasks;
/// the sink is owned by this function, which drains a channel of record
/// batches, so no global record order across shards is guaranteed. Per-shard
/// record order follows receipt order. Output is flushed after every batch,
/// so a partial snapshot survives an abort intact.
pub async fn run_crawl<W: Write>(
    shards: Vec<String>,
    spec: QuerySpec,
    fetcher: Arc<dyn PageFetcher>,
    writer: &mut SnapshotWriter<W>,
    options: &CrawlOptions,
) -> Result<CrawlSummary, CrawlError> {
    let shards_attempted = shards.len();
    if shards.is_empty() {
        tracing::warn!("shard directory is empty, writing header-only snapshot");
        writer.flush()?;
        return Ok(CrawlSummary::default());
    }

    let spec = Arc::new(spec);
    let semaphore = Arc::new(Semaphore::new(options.workers.max(1)));
    let (tx, rx) = flume::unbounded::<ShardEvent>();

    for (index, shard) in shards.into_iter().enumerate() {
        let fetcher = Arc::clone(&fetcher);
        let spec = Arc::clone(&spec);
        let semaphore = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            // Closed semaphore is unreachable; treat it as a cancelled run.
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };

            tracing::info!(%shard, "querying shard");
            let mut paginator = ShardPaginator::new(fetcher, spec, shard.clone());
            let mut error = None;

            loop {
                match paginator.next_page().await {
                    Ok(Some(records)) => {
                        let progress = paginator.progress();
                        tracing::debug!(
                            %shard,
                            emitted = progress.records_emitted,
                            total = progress.total_found.unwrap_or(0),
                            "page complete"
                        );
                        if !records.is_empty()
                            && tx.send_async(ShardEvent::Batch(records)).await.is_err()
                        {
                            // Writer loop is gone (fail-fast abort); stop.
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(%shard, error = %e, "shard failed");
                        error = Some(e);
                        break;
                    }
                }
            }

            let progress = paginator.progress();
            let report = ShardReport {
                shard,
                total_found: progress.total_found.unwrap_or(0),
                records_emitted: progress.records_emitted,
                malformed_skipped: progress.malformed_skipped,
                error: error.as_ref().map(|e| e.to_string()),
            };
            let _ = tx
                .send_async(ShardEvent::Finished {
                    index,
                    report,
                    error,
                })
                .await;
        });
    }
    // Workers hold the remaining senders; the drain loop ends when the last
    // one finishes.
    drop(tx);

    let mut reports: Vec<Option<ShardReport>> = vec![None; shards_attempted];
    while let Ok(event) = rx.recv_async().await {
        match event {
            ShardEvent::Batch(records) => {
                for record in &records {
                    writer.write_record(record)?;
                }
                writer.flush()?;
            }
            ShardEvent::Finished {
                index,
                report,
                error,
            } => {
                if let Some(e) = error {
                    if options.fail_fast {
                        writer.flush()?;
                        return Err(CrawlError::Shard(e));
                    }
                }
                reports[index] = Some(report);
            }
        }
    }
    writer.flush()?;

    // Reports come back in completion order; reassemble directory order.
    let shards: Vec<ShardReport> = reports.into_iter().flatten().collect();
    let summary = CrawlSummary {
        shards_attempted,
        shards_completed: shards.iter().filter(|r| r.error.is_none()).count(),
        total_records_emitted: shards.iter().map(|r| r.records_emitted).sum(),
        shards,
    };
    Ok(summary)
}
