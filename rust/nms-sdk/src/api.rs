use crate::error::ApiError;
use crate::model::{MetricSample, SessionState, Subscriber, SubscriberPage};
use async_trait::async_trait;
use std::collections::HashMap;

/// REST surface the subscriber cache is built on.
///
/// Implementations own transport concerns (serialization, auth, timeouts).
/// A missing subscriber must surface as [`ApiError::NotFound`].
#[async_trait]
pub trait SubscriberApi: Send + Sync + 'static {
    /// One page of the token-cursor listing. `None` requests the first page.
    async fn list(
        &self,
        page_token: Option<&str>,
        page_size: Option<usize>,
    ) -> Result<SubscriberPage, ApiError>;

    async fn get(&self, id: &str) -> Result<Subscriber, ApiError>;

    async fn create(&self, subscribers: &[Subscriber]) -> Result<(), ApiError>;

    async fn update(&self, id: &str, subscriber: &Subscriber) -> Result<(), ApiError>;

    async fn delete(&self, id: &str) -> Result<(), ApiError>;

    /// Session state for one subscriber, or for the whole network.
    async fn session_state(
        &self,
        id: Option<&str>,
    ) -> Result<HashMap<String, SessionState>, ApiError>;

    /// Per-subscriber samples for a metrics query expression.
    async fn metrics(&self, query: &str) -> Result<Vec<MetricSample>, ApiError>;
}
