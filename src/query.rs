use crate::config::Config;

/// Immutable description of one crawl's query: constructed once per
/// invocation and shared read-only across every shard pagination.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    /// Project filter, e.g. "CMIP5".
    pub project: String,
    /// Fields to extract, in dump order.
    pub fields: Vec<String>,
    /// SOLR collection to query.
    pub core: String,
    /// Rows requested per page.
    pub page_size: usize,
}

impl QuerySpec {
    /// Build a spec with the standard dump fields, core and page size.
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            fields: Config::DUMP_FIELDS.iter().map(|s| s.to_string()).collect(),
            core: Config::SOLR_CORE.to_string(),
            page_size: Config::PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// SOLR select URL for the page window starting at `offset`.
    pub fn select_url(&self, shard: &str, offset: u64) -> String {
        format!(
            "http://{shard}/{core}/select?q=project:{project}&fl={fields}&wt=json&start={start}&rows={rows}",
            shard = shard,
            core = self.core,
            project = self.project,
            fields = self.fields.join(","),
            start = offset,
            rows = self.page_size,
        )
    }
}
