use crate::api::SubscriberApi;
use crate::config::SubscriberConfig;
use crate::error::{Result, SubscriberError};
use crate::metrics::merge_samples;
use crate::model::{
    GatewaySubscriberMap, SessionState, Subscriber, SubscriberMetrics, SubscriberRow,
};
use crate::query::SubscriberTable;
use crate::store::KeyedStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct ContextInner {
    api: Arc<dyn SubscriberApi>,
    config: SubscriberConfig,
    records: KeyedStore<Subscriber>,
    sessions: KeyedStore<SessionState>,
    metrics: KeyedStore<SubscriberMetrics>,
    total_count: AtomicU64,
}

/// Subscriber state shared by every view of one network.
///
/// Cloning is cheap; all clones see the same stores. Created when the
/// subscriber views mount and dropped when they unmount.
#[derive(Clone)]
pub struct SubscriberContext {
    inner: Arc<ContextInner>,
}

impl SubscriberContext {
    /// Empty context; nothing is fetched until a query or refresh runs.
    pub fn new(api: Arc<dyn SubscriberApi>, config: SubscriberConfig) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                api,
                config,
                records: KeyedStore::new(),
                sessions: KeyedStore::new(),
                metrics: KeyedStore::new(),
                total_count: AtomicU64::new(0),
            }),
        }
    }

    /// Context populated with the first page, session state and metrics.
    ///
    /// Only a failure of the subscriber listing is an error; session state and
    /// metrics are best effort.
    pub async fn mount(api: Arc<dyn SubscriberApi>, config: SubscriberConfig) -> Result<Self> {
        let ctx = Self::new(api, config);
        ctx.load_first_page().await?;

        if let Err(e) = ctx.refresh_session_state().await {
            tracing::warn!("initial session state fetch failed: {}", e);
        }
        ctx.refresh_metrics().await;

        Ok(ctx)
    }

    async fn load_first_page(&self) -> Result<()> {
        let page = self
            .api()
            .list(None, Some(self.config().page_size))
            .await
            .map_err(|e| SubscriberError::fetch(&e))?;

        tracing::debug!(
            "mounted with {} subscribers of {}",
            page.subscribers.len(),
            page.total_count
        );
        self.set_total_count(page.total_count);
        self.records()
            .replace_all(page.subscribers.into_iter().collect())
            .await;
        Ok(())
    }

    pub fn api(&self) -> &Arc<dyn SubscriberApi> {
        &self.inner.api
    }

    pub fn config(&self) -> &SubscriberConfig {
        &self.inner.config
    }

    pub fn records(&self) -> &KeyedStore<Subscriber> {
        &self.inner.records
    }

    pub fn sessions(&self) -> &KeyedStore<SessionState> {
        &self.inner.sessions
    }

    pub fn metrics(&self) -> &KeyedStore<SubscriberMetrics> {
        &self.inner.metrics
    }

    /// Total subscribers reported by the last main-table page fetch.
    pub fn total_count(&self) -> u64 {
        self.inner.total_count.load(Ordering::Acquire)
    }

    pub(crate) fn set_total_count(&self, total: u64) {
        self.inner.total_count.store(total, Ordering::Release);
    }

    /// Table bound to the shared record store.
    pub fn table(&self) -> SubscriberTable {
        SubscriberTable::new(self.clone(), true)
    }

    /// Table that pages independently and never writes the stores.
    pub fn detached_table(&self) -> SubscriberTable {
        SubscriberTable::new(self.clone(), false)
    }

    pub async fn refresh_session_state(&self) -> Result<()> {
        let states = self
            .api()
            .session_state(None)
            .await
            .map_err(|e| SubscriberError::fetch(&e))?;
        self.sessions().replace_all(states).await;
        Ok(())
    }

    /// Refetch one subscriber's session state and fold it into the store.
    pub async fn refresh_session_for(&self, id: &str) -> Result<()> {
        let states = self
            .api()
            .session_state(Some(id))
            .await
            .map_err(|e| SubscriberError::fetch(&e))?;

        for (key, state) in states {
            let merged = match self.sessions().get(&key).await {
                Some(mut current) => {
                    current.merge(state);
                    current
                }
                None => state,
            };
            self.sessions().upsert(key, merged).await;
        }
        Ok(())
    }

    /// Rebuild the metrics overlay. Failed queries contribute no data.
    pub async fn refresh_metrics(&self) {
        let mut overlay = HashMap::new();
        for query in &self.config().metrics_queries {
            match self.api().metrics(query.expression()).await {
                Ok(samples) => merge_samples(&mut overlay, query, samples),
                Err(e) => tracing::warn!("metrics query {} failed: {}", query.name(), e),
            }
        }
        self.metrics().replace_all(overlay).await;
    }

    /// Subscribers grouped by the gateway they were last seen on.
    pub async fn gateway_subscriber_map(&self) -> GatewaySubscriberMap {
        let mut map = GatewaySubscriberMap::new();
        for (id, state) in self.sessions().all().await {
            if let Some(gateway) = state.current_gateway() {
                map.entry(gateway.to_string()).or_default().push(id);
            }
        }
        for ids in map.values_mut() {
            ids.sort();
        }
        map
    }

    pub(crate) async fn project(&self, subscriber: &Subscriber) -> SubscriberRow {
        let session = self.sessions().get(&subscriber.id).await;
        let metrics = self.metrics().get(&subscriber.id).await;
        SubscriberRow::project(subscriber, session.as_ref(), metrics.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::model::{Directory, MetricSample, SubscriberPage};
    use async_trait::async_trait;

    type ApiResult<T> = std::result::Result<T, ApiError>;

    struct SessionsOnly;

    #[async_trait]
    impl SubscriberApi for SessionsOnly {
        async fn list(&self, _: Option<&str>, _: Option<usize>) -> ApiResult<SubscriberPage> {
            Err(ApiError::Other("offline".to_string()))
        }

        async fn get(&self, id: &str) -> ApiResult<Subscriber> {
            Err(ApiError::NotFound(id.to_string()))
        }

        async fn create(&self, _: &[Subscriber]) -> ApiResult<()> {
            Ok(())
        }

        async fn update(&self, _: &str, _: &Subscriber) -> ApiResult<()> {
            Ok(())
        }

        async fn delete(&self, _: &str) -> ApiResult<()> {
            Ok(())
        }

        async fn session_state(&self, _: Option<&str>) -> ApiResult<HashMap<String, SessionState>> {
            let at = |gw: &str| SessionState {
                directory: Some(Directory {
                    location_history: vec![gw.to_string(), "gw-old".to_string()],
                }),
                ..Default::default()
            };
            Ok(HashMap::from([
                ("IMSI001010000000002".to_string(), at("gw-1")),
                ("IMSI001010000000001".to_string(), at("gw-1")),
                ("IMSI001010000000003".to_string(), at("gw-2")),
                ("IMSI001010000000004".to_string(), SessionState::default()),
            ]))
        }

        async fn metrics(&self, _: &str) -> ApiResult<Vec<MetricSample>> {
            Err(ApiError::Status {
                status: 503,
                message: "prometheus down".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_mount_fails_when_listing_fails() {
        let err = SubscriberContext::mount(Arc::new(SessionsOnly), SubscriberConfig::default())
            .await
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "offline");
    }

    #[tokio::test]
    async fn test_gateway_map_groups_by_latest_gateway() {
        let ctx = SubscriberContext::new(Arc::new(SessionsOnly), SubscriberConfig::default());
        ctx.refresh_session_state().await.unwrap();

        let map = ctx.gateway_subscriber_map().await;
        assert_eq!(map.len(), 2);
        assert_eq!(
            map["gw-1"],
            vec![
                "IMSI001010000000001".to_string(),
                "IMSI001010000000002".to_string()
            ]
        );
        assert_eq!(map["gw-2"], vec!["IMSI001010000000003".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_metrics_leave_empty_overlay() {
        let ctx = SubscriberContext::new(Arc::new(SessionsOnly), SubscriberConfig::default());
        ctx.metrics()
            .upsert("IMSI001010000000001", SubscriberMetrics::default())
            .await;

        ctx.refresh_metrics().await;
        assert!(ctx.metrics().is_empty().await);
    }
}
