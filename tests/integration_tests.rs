//! End-to-end crawl tests driving the orchestrator against in-memory shards.

use async_trait::async_trait;
use esgf_snapshot::{
    run_crawl, CrawlError, CrawlOptions, FetchError, PageFetcher, QuerySpec, SnapshotWriter,
    SolrPage,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One fake shard's behavior in the federation.
enum Fixture {
    /// Serves slices of this document list.
    Docs(Vec<Map<String, Value>>),
    /// Fails every request.
    Down,
}

/// In-memory federation of shards, recording every requested offset.
struct FakeFederation {
    shards: HashMap<String, Fixture>,
    requests: Mutex<Vec<(String, u64)>>,
}

impl FakeFederation {
    fn new() -> Self {
        Self {
            shards: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn with_docs(mut self, shard: &str, count: usize) -> Self {
        self.shards.insert(shard.to_string(), Fixture::Docs(docs(count)));
        self
    }

    fn with_down_shard(mut self, shard: &str) -> Self {
        self.shards.insert(shard.to_string(), Fixture::Down);
        self
    }

    fn offsets_for(&self, shard: &str) -> Vec<u64> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == shard)
            .map(|(_, offset)| *offset)
            .collect()
    }
}

fn docs(count: usize) -> Vec<Map<String, Value>> {
    (0..count)
        .map(|i| {
            json!({
                "instance_id": format!("cmip5.ds{i}.v20130101"),
                "data_node": "data.example.org",
                "index_node": "index.example.org",
                "size": 1000 + i as u64,
                "replica": i % 2 == 1,
                "timestamp": "2013-05-01T12:00:00Z",
            })
            .as_object()
            .unwrap()
            .clone()
        })
        .collect()
}

#[async_trait]
impl PageFetcher for FakeFederation {
    async fn fetch_page(
        &self,
        shard: &str,
        spec: &QuerySpec,
        offset: u64,
    ) -> Result<SolrPage, FetchError> {
        self.requests
            .lock()
            .unwrap()
            .push((shard.to_string(), offset));
        match self.shards.get(shard) {
            Some(Fixture::Docs(docs)) => {
                let start = (offset as usize).min(docs.len());
                let end = (start + spec.page_size).min(docs.len());
                Ok(SolrPage {
                    num_found: docs.len() as u64,
                    docs: docs[start..end].to_vec(),
                })
            }
            Some(Fixture::Down) | None => Err(FetchError::Status(503)),
        }
    }
}

fn spec(page_size: usize) -> QuerySpec {
    QuerySpec::new("CMIP5").with_page_size(page_size)
}

fn sequential() -> CrawlOptions {
    CrawlOptions {
        workers: 1,
        fail_fast: false,
    }
}

/// Run a crawl into an in-memory sink and return (summary-or-error, output).
async fn crawl(
    shards: Vec<&str>,
    federation: Arc<FakeFederation>,
    page_size: usize,
    options: CrawlOptions,
) -> (
    Result<esgf_snapshot::CrawlSummary, CrawlError>,
    String,
) {
    let spec = spec(page_size);
    let mut writer = SnapshotWriter::new(Vec::new(), &spec.fields).unwrap();
    let result = run_crawl(
        shards.into_iter().map(String::from).collect(),
        spec,
        federation,
        &mut writer,
        &options,
    )
    .await;
    let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    (result, output)
}

fn data_lines(output: &str) -> Vec<&str> {
    output
        .lines()
        .filter(|line| !line.starts_with('#'))
        .collect()
}

const HEADER: &str = "# instance_id\tdata_node\tindex_node\tsize\treplica\ttimestamp";

#[tokio::test]
async fn test_single_small_shard() {
    // 3 matches with page size 500: one request at offset 0 covers everything.
    let federation = Arc::new(FakeFederation::new().with_docs("host1:8984/solr", 3));
    let (result, output) = crawl(
        vec!["host1:8984/solr"],
        federation.clone(),
        500,
        sequential(),
    )
    .await;

    let summary = result.unwrap();
    assert_eq!(summary.shards_attempted, 1);
    assert_eq!(summary.shards_completed, 1);
    assert_eq!(summary.total_records_emitted, 3);
    assert_eq!(federation.offsets_for("host1:8984/solr"), vec![0]);

    assert_eq!(output.lines().next().unwrap(), HEADER);
    assert_eq!(data_lines(&output).len(), 3);
}

#[tokio::test]
async fn test_multi_page_shard() {
    // 1200 matches with page size 500 paginate at offsets 0, 500, 1000.
    let federation = Arc::new(FakeFederation::new().with_docs("host1:8984/solr", 1200));
    let (result, output) = crawl(
        vec!["host1:8984/solr"],
        federation.clone(),
        500,
        sequential(),
    )
    .await;

    let summary = result.unwrap();
    assert_eq!(summary.total_records_emitted, 1200);
    assert_eq!(
        federation.offsets_for("host1:8984/solr"),
        vec![0, 500, 1000]
    );
    assert_eq!(data_lines(&output).len(), 1200);
}

#[tokio::test]
async fn test_failed_shard_is_isolated() {
    // Default policy: a dead shard is recorded in the summary while the
    // healthy shard's records survive and the run completes.
    let federation = Arc::new(
        FakeFederation::new()
            .with_docs("good:8983/solr", 2)
            .with_down_shard("down:8983/solr"),
    );
    let (result, output) = crawl(
        vec!["good:8983/solr", "down:8983/solr"],
        federation,
        500,
        sequential(),
    )
    .await;

    let summary = result.unwrap();
    assert_eq!(summary.shards_attempted, 2);
    assert_eq!(summary.shards_completed, 1);
    assert_eq!(summary.failed_shards(), 1);
    assert_eq!(summary.total_records_emitted, 2);

    // Summary stays in directory order regardless of completion order.
    assert_eq!(summary.shards[0].shard, "good:8983/solr");
    assert!(summary.shards[0].error.is_none());
    assert_eq!(summary.shards[1].shard, "down:8983/solr");
    let error = summary.shards[1].error.as_ref().unwrap();
    assert!(error.contains("down:8983/solr"));
    assert!(error.contains("offset 0"));

    assert_eq!(data_lines(&output).len(), 2);
}

#[tokio::test]
async fn test_fail_fast_aborts_but_keeps_output() {
    // Fail-fast policy: the run aborts on the dead shard, but the first
    // shard's 2 lines are already flushed to the sink.
    let federation = Arc::new(
        FakeFederation::new()
            .with_docs("good:8983/solr", 2)
            .with_down_shard("down:8983/solr"),
    );
    let (result, output) = crawl(
        vec!["good:8983/solr", "down:8983/solr"],
        federation,
        500,
        CrawlOptions {
            workers: 1,
            fail_fast: true,
        },
    )
    .await;

    match result {
        Err(CrawlError::Shard(e)) => {
            assert_eq!(e.shard, "down:8983/solr");
            assert_eq!(e.offset, 0);
        }
        _ => panic!("expected the run to abort with a shard failure"),
    }

    assert_eq!(output.lines().next().unwrap(), HEADER);
    assert_eq!(data_lines(&output).len(), 2);
}

#[tokio::test]
async fn test_empty_directory() {
    // No shards: header-only snapshot and a successful zero summary.
    let federation = Arc::new(FakeFederation::new());
    let (result, output) = crawl(vec![], federation, 500, sequential()).await;

    let summary = result.unwrap();
    assert_eq!(summary.shards_attempted, 0);
    assert_eq!(summary.total_records_emitted, 0);
    assert_eq!(output, format!("{HEADER}\n"));
}

#[tokio::test]
async fn test_empty_shard_still_probed() {
    // A shard reporting zero matches gets exactly one probing request.
    let federation = Arc::new(FakeFederation::new().with_docs("empty:8983/solr", 0));
    let (result, output) = crawl(
        vec!["empty:8983/solr"],
        federation.clone(),
        500,
        sequential(),
    )
    .await;

    let summary = result.unwrap();
    assert_eq!(summary.shards_completed, 1);
    assert_eq!(summary.total_records_emitted, 0);
    assert_eq!(federation.offsets_for("empty:8983/solr"), vec![0]);
    assert_eq!(data_lines(&output).len(), 0);
}

#[tokio::test]
async fn test_line_format() {
    // Six tab-separated fields per line, True/False replica, decimal size.
    let federation = Arc::new(FakeFederation::new().with_docs("host1:8984/solr", 4));
    let (result, output) = crawl(
        vec!["host1:8984/solr"],
        federation,
        500,
        sequential(),
    )
    .await;
    result.unwrap();

    let lines = data_lines(&output);
    assert_eq!(lines.len(), 4);
    for line in &lines {
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 6);
        assert!(fields[3].chars().all(|c| c.is_ascii_digit()));
        assert!(fields[4] == "True" || fields[4] == "False");
    }
    assert!(lines.iter().any(|l| l.contains("\tTrue\t")));
    assert!(lines.iter().any(|l| l.contains("\tFalse\t")));
}

#[tokio::test]
async fn test_concurrent_workers_emit_whole_lines() {
    // With several shards in flight, per-line integrity and per-shard record
    // counts must hold even though global order is unspecified.
    let federation = Arc::new(
        FakeFederation::new()
            .with_docs("a:8983/solr", 30)
            .with_docs("b:8983/solr", 45)
            .with_docs("c:8983/solr", 7),
    );
    let (result, output) = crawl(
        vec!["a:8983/solr", "b:8983/solr", "c:8983/solr"],
        federation.clone(),
        10,
        CrawlOptions {
            workers: 3,
            fail_fast: false,
        },
    )
    .await;

    let summary = result.unwrap();
    assert_eq!(summary.shards_completed, 3);
    assert_eq!(summary.total_records_emitted, 82);
    assert_eq!(data_lines(&output).len(), 82);
    for line in data_lines(&output) {
        assert_eq!(line.split('\t').count(), 6);
    }

    // Offsets stay strictly increasing page multiples per shard.
    assert_eq!(federation.offsets_for("a:8983/solr"), vec![0, 10, 20]);
    assert_eq!(
        federation.offsets_for("b:8983/solr"),
        vec![0, 10, 20, 30, 40]
    );
    assert_eq!(federation.offsets_for("c:8983/solr"), vec![0]);
}

#[tokio::test]
async fn test_malformed_documents_are_counted_not_fatal() {
    let mut bad_docs = docs(3);
    bad_docs[1].insert("size".to_string(), json!(null));
    let mut federation = FakeFederation::new();
    federation
        .shards
        .insert("host1:8984/solr".to_string(), Fixture::Docs(bad_docs));
    let federation = Arc::new(federation);

    let (result, output) = crawl(
        vec!["host1:8984/solr"],
        federation,
        500,
        sequential(),
    )
    .await;

    let summary = result.unwrap();
    assert_eq!(summary.shards_completed, 1);
    assert_eq!(summary.total_records_emitted, 2);
    assert_eq!(summary.shards[0].malformed_skipped, 1);
    assert_eq!(data_lines(&output).len(), 2);
}

/// Snapshot round-trip at the consumer boundary: downstream reads the file as
/// an unordered table keyed by instance_id.
#[tokio::test]
async fn test_snapshot_readable_as_table() {
    let federation = Arc::new(FakeFederation::new().with_docs("host1:8984/solr", 12));
    let (result, output) = crawl(
        vec!["host1:8984/solr"],
        federation,
        5,
        sequential(),
    )
    .await;
    result.unwrap();

    let mut seen = std::collections::HashSet::new();
    for line in data_lines(&output) {
        let fields: Vec<&str> = line.split('\t').collect();
        assert!(seen.insert(fields[0].to_string()), "duplicate instance_id");
    }
    assert_eq!(seen.len(), 12);
}
