use crate::config::Config;
use crate::query::QuerySpec;
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// One decoded page of a shard's result set.
#[derive(Debug, Clone)]
pub struct SolrPage {
    /// Total matching documents reported by the shard.
    pub num_found: u64,
    /// Documents in this page window, in the order the shard returned them.
    pub docs: Vec<Map<String, Value>>,
}

/// Shape of the SOLR select response body.
#[derive(Debug, Deserialize)]
struct SelectBody {
    response: SelectResponse,
}

#[derive(Debug, Deserialize)]
struct SelectResponse {
    #[serde(rename = "numFound")]
    num_found: u64,
    docs: Vec<Map<String, Value>>,
}

/// Errors that can occur fetching one page from a shard.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timeout")]
    Timeout,

    #[error("shard returned HTTP {0}")]
    Status(u16),

    #[error("failed to decode response body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Transient failures are retried with backoff; permanent ones are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout => true,
            FetchError::Network(_) => true,
            // Server-side errors may clear; client errors will not.
            FetchError::Status(code) => *code >= 500,
            // A body that does not parse will not parse on retry either.
            FetchError::Decode(_) => false,
        }
    }
}

/// How many times a failed page fetch is retried, and how long to wait
/// before each retry.
///
/// The wait doubles per retry from `base` up to `cap`, plus up to a quarter
/// of jitter so shards that fail together do not hammer the index in
/// lockstep. Retry numbering matches the page-fetch loop: retry 1 follows
/// the initial attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetrySchedule {
    max_retries: u32,
    base: Duration,
    cap: Duration,
    jitter: bool,
}

impl RetrySchedule {
    pub fn new(max_retries: u32, base_ms: u64, cap_ms: u64) -> Self {
        Self {
            max_retries,
            base: Duration::from_millis(base_ms),
            cap: Duration::from_millis(cap_ms.max(base_ms)),
            jitter: true,
        }
    }

    /// Deterministic delays, for callers that need a reproducible schedule.
    pub fn no_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Wait before retry number `retry` (1-based), or `None` once the
    /// schedule is exhausted and the last error should be returned.
    pub fn delay_before(&self, retry: u32) -> Option<Duration> {
        if retry == 0 || retry > self.max_retries {
            return None;
        }
        let doublings = (retry - 1).min(20);
        let delay = self
            .base
            .saturating_mul(1u32.checked_shl(doublings).unwrap_or(u32::MAX))
            .min(self.cap);
        let jitter = if self.jitter && !delay.is_zero() {
            let quarter = (delay.as_millis() / 4) as u64;
            Duration::from_millis(rand::thread_rng().gen_range(0..=quarter))
        } else {
            Duration::ZERO
        };
        Some(delay + jitter)
    }
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::new(
            Config::MAX_RETRIES,
            Config::BACKOFF_BASE_MS,
            Config::BACKOFF_MAX_MS,
        )
    }
}

/// Transport capability for fetching page windows. The orchestrator and
/// paginator only see this trait, so tests can swap in an in-memory fake.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(
        &self,
        shard: &str,
        spec: &QuerySpec,
        offset: u64,
    ) -> Result<SolrPage, FetchError>;
}

/// HTTP client for the SOLR select endpoint, with a bounded retry loop
/// around each page fetch.
#[derive(Debug)]
pub struct SolrClient {
    client: reqwest::Client,
    retry: RetrySchedule,
}

impl SolrClient {
    pub fn new(timeout_secs: u64) -> Self {
        Self::with_retry(timeout_secs, RetrySchedule::default())
    }

    pub fn with_retry(timeout_secs: u64, retry: RetrySchedule) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(Config::CONNECT_TIMEOUT_SECS))
            .pool_max_idle_per_host(Config::POOL_IDLE_PER_HOST)
            .tcp_nodelay(true)
            .build()
            .expect("failed to build HTTP client");

        Self { client, retry }
    }

    async fn fetch_once(&self, url: &str) -> Result<SolrPage, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(Self::classify_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let parsed: SelectBody =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(SolrPage {
            num_found: parsed.response.num_found,
            docs: parsed.response.docs,
        })
    }

    fn classify_error(error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl PageFetcher for SolrClient {
    async fn fetch_page(
        &self,
        shard: &str,
        spec: &QuerySpec,
        offset: u64,
    ) -> Result<SolrPage, FetchError> {
        let url = spec.select_url(shard, offset);
        let mut retry = 0;

        loop {
            match self.fetch_once(&url).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_retryable() => {
                    retry += 1;
                    let Some(delay) = self.retry.delay_before(retry) else {
                        return Err(e);
                    };
                    tracing::warn!(%shard, offset, retry, error = %e, "page fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
