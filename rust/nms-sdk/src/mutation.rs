//! Writes against the REST layer, folded back into the local stores.
//!
//! Store updates only keep the cached page coherent until the caller re-runs
//! the table query; server-side ordering and derived fields come from that
//! refresh.

use crate::context::SubscriberContext;
use crate::error::{Result, SubscriberError, DEFAULT_WRITE_ERROR};
use crate::model::{SessionState, Subscriber, SubscriberId, SubscriberPatch};
use crate::validation::{subscribers_from_forms, validate_subscribers, SubscriberForm};
use std::collections::{HashMap, HashSet};

/// A single state change requested by a view.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriberOp {
    /// Swap the record store contents. Local only.
    ReplaceAll(HashMap<SubscriberId, Subscriber>),
    /// Swap the session state store contents. Local only.
    ReplaceSession(HashMap<SubscriberId, SessionState>),
    BulkCreate(Vec<Subscriber>),
    /// Update when the id is in the record store, create otherwise.
    Upsert(Subscriber),
    Delete(SubscriberId),
}

impl SubscriberContext {
    pub async fn set_state(&self, op: SubscriberOp) -> Result<()> {
        match op {
            SubscriberOp::ReplaceAll(records) => {
                self.records().replace_all(records).await;
                Ok(())
            }
            SubscriberOp::ReplaceSession(sessions) => {
                self.sessions().replace_all(sessions).await;
                Ok(())
            }
            SubscriberOp::BulkCreate(subscribers) => {
                self.create_many(subscribers).await.map(|_| ())
            }
            SubscriberOp::Upsert(subscriber) => {
                if self.records().contains_key(&subscriber.id).await {
                    let id = subscriber.id.clone();
                    self.update(&id, subscriber).await
                } else {
                    self.create(subscriber).await
                }
            }
            SubscriberOp::Delete(id) => self.delete(&id).await,
        }
    }

    async fn existing_ids(&self) -> HashSet<String> {
        self.records().keys().await.into_iter().collect()
    }

    pub async fn create(&self, subscriber: Subscriber) -> Result<()> {
        let existing = self.existing_ids().await;
        validate_subscribers(std::slice::from_ref(&subscriber), |id| {
            existing.contains(id)
        })?;

        self.api()
            .create(std::slice::from_ref(&subscriber))
            .await
            .map_err(|e| SubscriberError::write(&subscriber.id, &e))?;

        tracing::debug!("created subscriber {}", subscriber.id);
        self.confirm(subscriber).await;
        Ok(())
    }

    /// Create subscribers in sequential chunks of `chunk_size`.
    ///
    /// Returns the number created. A failed chunk stops the run; the error
    /// carries how many subscribers were saved by the chunks before it.
    pub async fn create_many(&self, subscribers: Vec<Subscriber>) -> Result<usize> {
        let existing = self.existing_ids().await;
        validate_subscribers(&subscribers, |id| existing.contains(id))?;

        let chunk_size = self.config().chunk_size.max(1);
        let chunks = subscribers.len().div_ceil(chunk_size);
        let mut succeeded = 0;

        for (index, chunk) in subscribers.chunks(chunk_size).enumerate() {
            if let Err(e) = self.api().create(chunk).await {
                tracing::warn!(
                    "bulk create chunk {}/{} failed after {} saved: {}",
                    index + 1,
                    chunks,
                    succeeded,
                    e
                );
                return Err(SubscriberError::PartialBatch {
                    succeeded,
                    message: e.user_message(DEFAULT_WRITE_ERROR),
                });
            }

            for subscriber in chunk {
                self.records()
                    .upsert(subscriber.id.clone(), subscriber.clone())
                    .await;
            }
            succeeded += chunk.len();
            tracing::info!(
                "saved subscriber chunk {}/{} ({}/{})",
                index + 1,
                chunks,
                succeeded,
                subscribers.len()
            );
        }

        Ok(succeeded)
    }

    /// Validate operator input, then create it in chunks.
    pub async fn create_from_forms(&self, forms: Vec<SubscriberForm>) -> Result<usize> {
        let existing = self.existing_ids().await;
        let subscribers = subscribers_from_forms(forms, |id| existing.contains(id))?;
        self.create_many(subscribers).await
    }

    pub async fn update(&self, key: &str, subscriber: Subscriber) -> Result<()> {
        if subscriber.id != key {
            return Err(SubscriberError::KeyMismatch {
                key: key.to_string(),
                id: subscriber.id,
            });
        }

        self.api()
            .update(key, &subscriber)
            .await
            .map_err(|e| SubscriberError::write(key, &e))?;

        tracing::debug!("updated subscriber {}", key);
        self.confirm(subscriber).await;
        Ok(())
    }

    /// Merge `patch` into the current record and write the result.
    pub async fn patch(&self, key: &str, patch: SubscriberPatch) -> Result<()> {
        let mut subscriber = match self.records().get(key).await {
            Some(subscriber) => subscriber,
            None => match self.api().get(key).await {
                Ok(subscriber) => subscriber,
                Err(e) if e.is_not_found() => {
                    return Err(SubscriberError::NotFound(key.to_string()))
                }
                Err(e) => return Err(SubscriberError::fetch(&e)),
            },
        };
        subscriber.merge(patch);
        self.update(key, subscriber).await
    }

    /// Delete `key`. Already-absent subscribers are not an error.
    pub async fn delete(&self, key: &str) -> Result<()> {
        match self.api().delete(key).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!("delete of absent subscriber {}", key);
            }
            Err(e) => return Err(SubscriberError::write(key, &e)),
        }

        self.records().remove(key).await;
        self.sessions().remove(key).await;
        Ok(())
    }

    /// Store the server's copy of a just-written subscriber, falling back to
    /// the local copy, and pick up its session state.
    async fn confirm(&self, local: Subscriber) {
        let id = local.id.clone();
        let confirmed = match self.api().get(&id).await {
            Ok(subscriber) => subscriber,
            Err(e) => {
                tracing::warn!("refetch of {} failed, keeping local copy: {}", id, e);
                local
            }
        };
        self.records().upsert(id.clone(), confirmed).await;

        if let Err(e) = self.refresh_session_for(&id).await {
            tracing::warn!("session state refresh for {} failed: {}", id, e);
        }
    }
}
