use crate::metrics::MetricsQuery;
use std::time::Duration;

/// Rows requested per page by the subscriber table.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Subscribers per bulk create request.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

pub const DEFAULT_ID_PREFIX: &str = "IMSI";

/// Search text must be longer than this to be treated as a point lookup.
pub const DEFAULT_LOOKUP_MIN_LEN: usize = 9;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub page_size: usize,
    pub chunk_size: usize,
    pub id_prefix: String,
    pub lookup_min_len: usize,
    pub metrics_queries: Vec<MetricsQuery>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            lookup_min_len: DEFAULT_LOOKUP_MIN_LEN,
            metrics_queries: vec![MetricsQuery::CurrentUsage, MetricsQuery::DailyAverage],
        }
    }
}

impl SubscriberConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    pub fn with_lookup_min_len(mut self, len: usize) -> Self {
        self.lookup_min_len = len;
        self
    }

    pub fn with_metrics_queries(mut self, queries: Vec<MetricsQuery>) -> Self {
        self.metrics_queries = queries;
        self
    }

    /// Whether `search` names a single subscriber rather than a filter.
    pub fn is_point_lookup(&self, search: &str) -> bool {
        search.starts_with(&self.id_prefix) && search.chars().count() > self.lookup_min_len
    }
}

/// Connection settings for [`HttpSubscriberApi`](crate::HttpSubscriberApi).
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub base_url: String,
    pub network_id: String,
    pub timeout: Duration,
}

impl HttpConfig {
    pub fn new(base_url: impl Into<String>, network_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            network_id: network_id.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Reads `NMS_API_URL` and `NMS_NETWORK_ID`.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("NMS_API_URL").ok()?;
        let network_id = std::env::var("NMS_NETWORK_ID").ok()?;
        Some(Self::new(base_url, network_id))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
