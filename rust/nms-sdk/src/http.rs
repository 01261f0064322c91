use crate::api::SubscriberApi;
use crate::config::HttpConfig;
use crate::error::ApiError;
use crate::metrics::parse_vector_response;
use crate::model::{MetricSample, SessionState, Subscriber, SubscriberPage};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// [`SubscriberApi`] over the network REST API.
#[derive(Debug, Clone)]
pub struct HttpSubscriberApi {
    config: HttpConfig,
    client: Client,
}

impl HttpSubscriberApi {
    pub fn new(config: HttpConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    fn subscribers_url(&self) -> String {
        format!(
            "{}/lte/{}/subscribers",
            self.config.base_url, self.config.network_id
        )
    }

    fn subscriber_url(&self, id: &str) -> String {
        format!("{}/{}", self.subscribers_url(), id)
    }

    fn session_state_url(&self) -> String {
        format!(
            "{}/lte/{}/subscriber_state",
            self.config.base_url, self.config.network_id
        )
    }

    fn metrics_url(&self) -> String {
        format!(
            "{}/networks/{}/prometheus/query",
            self.config.base_url, self.config.network_id
        )
    }

    async fn handle_response<T: DeserializeOwned>(
        response: Response,
        resource: &str,
    ) -> Result<T, ApiError> {
        let response = Self::check_status(response, resource).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn check_status(response: Response, resource: &str) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(resource.to_string()));
        }
        let message = response
            .json::<ErrorResponse>()
            .await
            .map(|e| e.message)
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

/// Query string for one listing page. An empty token means the first page.
fn list_params(page_token: Option<&str>, page_size: Option<usize>) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(size) = page_size {
        params.push(("page_size", size.to_string()));
    }
    if let Some(token) = page_token.filter(|t| !t.is_empty()) {
        params.push(("page_token", token.to_string()));
    }
    params
}

#[async_trait]
impl SubscriberApi for HttpSubscriberApi {
    async fn list(
        &self,
        page_token: Option<&str>,
        page_size: Option<usize>,
    ) -> Result<SubscriberPage, ApiError> {
        let query = list_params(page_token, page_size);

        tracing::debug!(
            "GET subscribers page (token set: {})",
            query.iter().any(|(key, _)| *key == "page_token")
        );
        let response = self
            .client
            .get(self.subscribers_url())
            .query(&query)
            .send()
            .await?;

        Self::handle_response(response, "subscribers").await
    }

    async fn get(&self, id: &str) -> Result<Subscriber, ApiError> {
        let response = self.client.get(self.subscriber_url(id)).send().await?;
        Self::handle_response(response, id).await
    }

    async fn create(&self, subscribers: &[Subscriber]) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.subscribers_url())
            .json(subscribers)
            .send()
            .await?;
        Self::check_status(response, "subscribers").await?;
        Ok(())
    }

    async fn update(&self, id: &str, subscriber: &Subscriber) -> Result<(), ApiError> {
        let response = self
            .client
            .put(self.subscriber_url(id))
            .json(subscriber)
            .send()
            .await?;
        Self::check_status(response, id).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let response = self.client.delete(self.subscriber_url(id)).send().await?;
        Self::check_status(response, id).await?;
        Ok(())
    }

    async fn session_state(
        &self,
        id: Option<&str>,
    ) -> Result<HashMap<String, SessionState>, ApiError> {
        match id {
            Some(id) => {
                let url = format!("{}/{}", self.session_state_url(), id);
                let response = self.client.get(url).send().await?;
                match Self::handle_response::<SessionState>(response, id).await {
                    Ok(state) => Ok(HashMap::from([(id.to_string(), state)])),
                    Err(ApiError::NotFound(_)) => Ok(HashMap::new()),
                    Err(e) => Err(e),
                }
            }
            None => {
                let response = self.client.get(self.session_state_url()).send().await?;
                Self::handle_response(response, "subscriber_state").await
            }
        }
    }

    async fn metrics(&self, query: &str) -> Result<Vec<MetricSample>, ApiError> {
        let response = self
            .client
            .get(self.metrics_url())
            .query(&[("query", query)])
            .send()
            .await?;
        let body: serde_json::Value = Self::handle_response(response, "metrics").await?;
        Ok(parse_vector_response(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let api = HttpSubscriberApi::new(HttpConfig::new(
            "https://nms.example.com/magma/v1",
            "lte_net",
        ))
        .unwrap();

        assert_eq!(
            api.subscribers_url(),
            "https://nms.example.com/magma/v1/lte/lte_net/subscribers"
        );
        assert_eq!(
            api.subscriber_url("IMSI001010000000001"),
            "https://nms.example.com/magma/v1/lte/lte_net/subscribers/IMSI001010000000001"
        );
        assert_eq!(
            api.session_state_url(),
            "https://nms.example.com/magma/v1/lte/lte_net/subscriber_state"
        );
        assert_eq!(
            api.metrics_url(),
            "https://nms.example.com/magma/v1/networks/lte_net/prometheus/query"
        );
    }

    #[test]
    fn test_list_params() {
        assert_eq!(
            list_params(Some("tok1"), None),
            vec![("page_token", "tok1".to_string())]
        );
        assert_eq!(
            list_params(Some(""), Some(10)),
            vec![("page_size", "10".to_string())]
        );
        assert!(list_params(None, None).is_empty());
    }
}
