//! Page and point-lookup queries for subscriber tables.
//!
//! Each [`SubscriberTable`] owns its own [`PageTokenLedger`], so a sub-dialog
//! paging through subscribers does not disturb the main table's cursor.

use crate::context::SubscriberContext;
use crate::error::{Result, SubscriberError};
use crate::ledger::PageTokenLedger;
use crate::model::{Subscriber, SubscriberRow};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberQuery {
    pub page: usize,
    /// Zero selects the configured page size.
    pub page_size: usize,
    pub search: String,
}

impl SubscriberQuery {
    pub fn page(page: usize, page_size: usize) -> Self {
        Self {
            page,
            page_size,
            search: String::new(),
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub data: Vec<SubscriberRow>,
    pub page: usize,
    pub total_count: u64,
}

/// A paginated view over the subscriber listing.
#[derive(Clone)]
pub struct SubscriberTable {
    ctx: SubscriberContext,
    ledger: Arc<Mutex<PageTokenLedger>>,
    generation: Arc<AtomicU64>,
    writes_store: bool,
}

impl SubscriberTable {
    pub(crate) fn new(ctx: SubscriberContext, writes_store: bool) -> Self {
        Self {
            ctx,
            ledger: Arc::new(Mutex::new(PageTokenLedger::new())),
            generation: Arc::new(AtomicU64::new(0)),
            writes_store,
        }
    }

    pub fn is_detached(&self) -> bool {
        !self.writes_store
    }

    /// Snapshot of the token ledger.
    pub async fn ledger(&self) -> PageTokenLedger {
        self.ledger.lock().await.clone()
    }

    /// Drop in-flight results and start over from the first page, e.g. after
    /// a filter change.
    pub async fn reset(&self) {
        self.cancel();
        *self.ledger.lock().await = PageTokenLedger::new();
    }

    /// Make every in-flight page fetch resolve as superseded.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub async fn query(&self, query: SubscriberQuery) -> Result<QueryResult> {
        let search = query.search.trim();
        if self.ctx.config().is_point_lookup(search) {
            return self.lookup(search).await;
        }
        self.fetch_page(query.page, query.page_size).await
    }

    async fn lookup(&self, id: &str) -> Result<QueryResult> {
        let total_count = self
            .ledger
            .lock()
            .await
            .total_count()
            .unwrap_or_else(|| self.ctx.total_count());

        let subscriber = match self.ctx.records().get(id).await {
            Some(subscriber) => Some(subscriber),
            None => match self.ctx.api().get(id).await {
                Ok(subscriber) => Some(subscriber),
                Err(e) if e.is_not_found() => None,
                Err(e) => {
                    tracing::warn!("lookup of {} failed: {}", id, e);
                    return Err(SubscriberError::fetch(&e));
                }
            },
        };

        let mut data = Vec::new();
        if let Some(subscriber) = subscriber {
            data.push(self.ctx.project(&subscriber).await);
        }

        Ok(QueryResult {
            data,
            page: 0,
            total_count,
        })
    }

    async fn fetch_page(&self, page: usize, page_size: usize) -> Result<QueryResult> {
        let ticket = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let page_size = if page_size == 0 {
            self.ctx.config().page_size
        } else {
            page_size
        };

        let (page, token) = {
            let ledger = self.ledger.lock().await;
            let page = ledger.resolve_page(page, page_size);
            (page, ledger.token_at(page).to_string())
        };

        let page_token = Some(token.as_str()).filter(|t| !t.is_empty());
        let response = self
            .ctx
            .api()
            .list(page_token, Some(page_size))
            .await
            .map_err(|e| {
                tracing::warn!("subscriber page {} fetch failed: {}", page, e);
                SubscriberError::fetch(&e)
            })?;

        let mut ledger = self.ledger.lock().await;
        if self.generation.load(Ordering::Acquire) != ticket {
            tracing::debug!("discarding stale response for page {}", page);
            return Err(SubscriberError::Superseded);
        }

        ledger.record(page, response.next_page_token.as_str());
        ledger.set_total_count(response.total_count);

        let subscribers: Vec<Subscriber> = response.subscribers.into_values().collect();
        if self.writes_store {
            self.ctx.set_total_count(response.total_count);
            self.ctx
                .records()
                .replace_all(
                    subscribers
                        .iter()
                        .map(|s| (s.id.clone(), s.clone()))
                        .collect(),
                )
                .await;
        }
        drop(ledger);

        let mut data = Vec::with_capacity(subscribers.len());
        for subscriber in &subscribers {
            data.push(self.ctx.project(subscriber).await);
        }

        Ok(QueryResult {
            data,
            page,
            total_count: response.total_count,
        })
    }
}
