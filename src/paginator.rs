//! Stateful pagination of one shard's result set.

use crate::models::DocumentRecord;
use crate::network::{FetchError, PageFetcher};
use crate::query::QuerySpec;
use std::sync::Arc;

/// Progress through one shard's result set. Offset only increases, always by
/// whole pages; `total_found` is captured from the first response and never
/// refreshed, so documents published mid-crawl are silently not fetched
/// (accepted approximation, matching the archive's point-in-time semantics).
#[derive(Debug, Clone)]
pub struct CrawlProgress {
    pub shard: String,
    pub offset: u64,
    pub total_found: Option<u64>,
    pub records_emitted: u64,
    pub malformed_skipped: u64,
}

/// A single shard's transport or decode failure at a known offset. Records
/// already emitted before the failure remain valid.
#[derive(Debug, thiserror::Error)]
#[error("shard {shard} unavailable at offset {offset}: {cause}")]
pub struct ShardUnavailableError {
    pub shard: String,
    pub offset: u64,
    #[source]
    pub cause: FetchError,
}

/// Pull-based lazy sequence of a shard's matching documents.
///
/// Each instance starts at offset 0; there is no persisted cursor, so a crawl
/// is restarted by constructing a new paginator. For a shard reporting N
/// matches with page size P, exactly `ceil(N/P)` requests are issued (one
/// probing request when N = 0).
pub struct ShardPaginator {
    fetcher: Arc<dyn PageFetcher>,
    spec: Arc<QuerySpec>,
    progress: CrawlProgress,
    done: bool,
}

impl ShardPaginator {
    pub fn new(fetcher: Arc<dyn PageFetcher>, spec: Arc<QuerySpec>, shard: String) -> Self {
        Self {
            fetcher,
            spec,
            progress: CrawlProgress {
                shard,
                offset: 0,
                total_found: None,
                records_emitted: 0,
                malformed_skipped: 0,
            },
            done: false,
        }
    }

    pub fn progress(&self) -> &CrawlProgress {
        &self.progress
    }

    /// Fetch and decode the next page window, or `None` once the shard is
    /// exhausted. A failed fetch ends the sequence permanently.
    pub async fn next_page(
        &mut self,
    ) -> Result<Option<Vec<DocumentRecord>>, ShardUnavailableError> {
        if self.done {
            return Ok(None);
        }

        let offset = self.progress.offset;
        let fetched = self
            .fetcher
            .fetch_page(&self.progress.shard, &self.spec, offset)
            .await;
        let page = match fetched {
            Ok(page) => page,
            Err(cause) => {
                self.done = true;
                return Err(ShardUnavailableError {
                    shard: self.progress.shard.clone(),
                    offset,
                    cause,
                });
            }
        };

        if self.progress.total_found.is_none() {
            self.progress.total_found = Some(page.num_found);
            tracing::info!(
                shard = %self.progress.shard,
                num_found = page.num_found,
                "first page received"
            );
        }

        let mut records = Vec::with_capacity(page.docs.len());
        for doc in &page.docs {
            match DocumentRecord::from_doc(doc, &self.spec.fields) {
                Ok(record) => records.push(record),
                Err(e) => {
                    self.progress.malformed_skipped += 1;
                    tracing::warn!(shard = %self.progress.shard, offset, error = %e, "skipping malformed document");
                }
            }
        }
        self.progress.records_emitted += records.len() as u64;

        self.progress.offset += self.spec.page_size as u64;
        // total_found is Some here: it was captured above on the first page.
        if self.progress.offset >= self.progress.total_found.unwrap_or(0) {
            self.done = true;
        }

        Ok(Some(records))
    }
}
