#![allow(dead_code)]

use async_trait::async_trait;
use nms_sdk::{ApiError, MetricSample, SessionState, Subscriber, SubscriberApi, SubscriberPage};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

#[derive(Default)]
pub struct MockState {
    pub subscribers: BTreeMap<String, Subscriber>,
    pub sessions: HashMap<String, SessionState>,
    pub usage: Vec<MetricSample>,
    /// Page token passed to each `list` call.
    pub list_calls: Vec<Option<String>>,
    pub get_calls: Vec<String>,
    /// Size of each `create` call.
    pub create_calls: Vec<usize>,
    pub update_calls: Vec<String>,
    pub delete_calls: Vec<String>,
    /// 1-based `create` call that fails.
    pub fail_create_on: Option<usize>,
    pub fail_list: Option<String>,
}

/// In-memory listing that pages with `tok{n}` tokens.
#[derive(Default)]
pub struct MockApi {
    pub state: Mutex<MockState>,
    list_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl MockApi {
    pub fn with_subscribers(count: usize) -> Arc<Self> {
        let api = Self::default();
        {
            let mut state = api.state.lock().unwrap();
            for i in 0..count {
                let sub = subscriber(i);
                state.subscribers.insert(sub.id.clone(), sub);
            }
        }
        Arc::new(api)
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Make `list` wait for a permit on the returned semaphore.
    pub fn gate_list(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.list_gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

pub fn imsi(i: usize) -> String {
    format!("IMSI00101{:010}", i)
}

pub fn subscriber(i: usize) -> Subscriber {
    Subscriber::new(imsi(i)).with_name(format!("ue-{}", i))
}

#[async_trait]
impl SubscriberApi for MockApi {
    async fn list(
        &self,
        page_token: Option<&str>,
        page_size: Option<usize>,
    ) -> Result<SubscriberPage, ApiError> {
        self.state()
            .list_calls
            .push(page_token.map(str::to_string));

        let gate = self.list_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| ApiError::Other(e.to_string()))?;
            permit.forget();
        }

        let state = self.state();
        if let Some(message) = &state.fail_list {
            return Err(ApiError::Status {
                status: 500,
                message: message.clone(),
            });
        }

        let page: usize = page_token
            .and_then(|t| t.strip_prefix("tok"))
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        let size = page_size.unwrap_or(100);
        let total = state.subscribers.len();
        let start = page * size;
        let end = (start + size).min(total);

        let subscribers = state
            .subscribers
            .iter()
            .skip(start)
            .take(end.saturating_sub(start))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let next_page_token = if end < total {
            format!("tok{}", page + 1)
        } else {
            String::new()
        };

        Ok(SubscriberPage {
            subscribers,
            next_page_token,
            total_count: total as u64,
        })
    }

    async fn get(&self, id: &str) -> Result<Subscriber, ApiError> {
        let mut state = self.state();
        state.get_calls.push(id.to_string());
        state
            .subscribers
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    async fn create(&self, subscribers: &[Subscriber]) -> Result<(), ApiError> {
        let mut state = self.state();
        state.create_calls.push(subscribers.len());
        if state.fail_create_on == Some(state.create_calls.len()) {
            return Err(ApiError::Status {
                status: 500,
                message: "datastore write failed".to_string(),
            });
        }
        for sub in subscribers {
            state.subscribers.insert(sub.id.clone(), sub.clone());
        }
        Ok(())
    }

    async fn update(&self, id: &str, subscriber: &Subscriber) -> Result<(), ApiError> {
        let mut state = self.state();
        state.update_calls.push(id.to_string());
        if !state.subscribers.contains_key(id) {
            return Err(ApiError::NotFound(id.to_string()));
        }
        state.subscribers.insert(id.to_string(), subscriber.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        state.delete_calls.push(id.to_string());
        state.sessions.remove(id);
        match state.subscribers.remove(id) {
            Some(_) => Ok(()),
            None => Err(ApiError::NotFound(id.to_string())),
        }
    }

    async fn session_state(
        &self,
        id: Option<&str>,
    ) -> Result<HashMap<String, SessionState>, ApiError> {
        let state = self.state();
        Ok(match id {
            Some(id) => state
                .sessions
                .get(id)
                .map(|s| HashMap::from([(id.to_string(), s.clone())]))
                .unwrap_or_default(),
            None => state.sessions.clone(),
        })
    }

    async fn metrics(&self, query: &str) -> Result<Vec<MetricSample>, ApiError> {
        if query.starts_with("sum") {
            Ok(self.state().usage.clone())
        } else {
            Ok(Vec::new())
        }
    }
}
