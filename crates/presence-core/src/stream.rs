// ── Reactive query subscriptions ──
//
// A `QueryStream` pairs a point-in-time `QueryState` with the watch
// receiver it came from, so consumers can render immediately and then
// await changes.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::QueryState;

pub struct QueryStream<T: Send + Sync + 'static> {
    current: QueryState<T>,
    receiver: watch::Receiver<QueryState<T>>,
}

impl<T: Send + Sync + 'static> QueryStream<T> {
    pub(crate) fn new(mut receiver: watch::Receiver<QueryState<T>>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    /// State captured at creation or at the last `changed()`.
    pub fn current(&self) -> &QueryState<T> {
        &self.current
    }

    pub fn data(&self) -> Option<&Arc<T>> {
        self.current.data.as_ref()
    }

    pub fn latest(&self) -> QueryState<T> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. `None` once the cache is dropped.
    pub async fn changed(&mut self) -> Option<QueryState<T>> {
        self.receiver.changed().await.ok()?;
        let state = self.receiver.borrow_and_update().clone();
        self.current = state.clone();
        Some(state)
    }

    pub fn into_stream(self) -> QueryWatchStream<T> {
        QueryWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding every new `QueryState`.
pub struct QueryWatchStream<T: Send + Sync + 'static> {
    inner: WatchStream<QueryState<T>>,
}

impl<T: Send + Sync + 'static> Stream for QueryWatchStream<T> {
    type Item = QueryState<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
