use crate::store::StoreUpdate;
use futures_util::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

pin_project! {
    /// Changes to a [`KeyedStore`](crate::store::KeyedStore).
    ///
    /// Lagged receivers skip the dropped updates; a `Replaced` update is the
    /// signal to re-read the whole store.
    pub struct StoreStream<T> {
        #[pin]
        inner: BroadcastStream<StoreUpdate<T>>,
        key_filter: Option<String>,
    }
}

impl<T> StoreStream<T>
where
    T: Clone + Send + 'static,
{
    pub fn new(rx: broadcast::Receiver<StoreUpdate<T>>) -> Self {
        Self {
            inner: BroadcastStream::new(rx),
            key_filter: None,
        }
    }

    /// Only yield changes to `key`, plus whole-store replacements.
    pub fn for_key(mut self, key: impl Into<String>) -> Self {
        self.key_filter = Some(key.into());
        self
    }
}

impl<T> Stream for StoreStream<T>
where
    T: Clone + Send + 'static,
{
    type Item = StoreUpdate<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(update))) => {
                    if let (Some(filter), Some(key)) = (this.key_filter.as_deref(), update.key()) {
                        if filter != key {
                            continue;
                        }
                    }
                    return Poll::Ready(Some(update));
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    tracing::debug!("store stream lagged, skipped {} updates", skipped);
                    continue;
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
