//! Paginated shard listing
//!
//! [`ShardLister::list`] turns the page-at-a-time [`ObjectStore::list_page`]
//! into a lazy stream of entries. Pages are only requested as the stream is
//! polled, and each call starts a fresh listing from the first page.

use futures::stream::{self, Stream, TryStreamExt};
use logmerge_common::{LogMergeError, Result};
use std::sync::Arc;
use tracing::trace;

use crate::storage::{ObjectStore, ShardEntry};

enum Cursor {
    Start,
    Next(String),
    Done,
}

#[derive(Clone)]
pub struct ShardLister {
    store: Arc<dyn ObjectStore>,
}

impl ShardLister {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Stream every entry under `prefix` in the store's listing order.
    ///
    /// Store errors end the stream with [`LogMergeError::Transfer`].
    pub fn list(&self, prefix: &str) -> impl Stream<Item = Result<ShardEntry>> + Send + 'static {
        let store = Arc::clone(&self.store);
        let prefix = prefix.to_string();

        stream::try_unfold(Cursor::Start, move |cursor| {
            let store = Arc::clone(&store);
            let prefix = prefix.clone();
            async move {
                let token = match cursor {
                    Cursor::Done => return Ok(None),
                    Cursor::Start => None,
                    Cursor::Next(token) => Some(token),
                };

                let page = store.list_page(&prefix, token.as_deref()).await?;
                trace!(prefix = %prefix, count = page.entries.len(), "Fetched listing page");

                let next = match page.next_token {
                    Some(token) => Cursor::Next(token),
                    None => Cursor::Done,
                };
                Ok::<_, LogMergeError>(Some((page.entries, next)))
            }
        })
        .map_ok(|entries| stream::iter(entries.into_iter().map(Ok::<_, LogMergeError>)))
        .try_flatten()
    }

    /// Collect a whole listing. Convenience for small prefixes and tests.
    pub async fn collect_keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.list(prefix).map_ok(|entry| entry.key).try_collect().await
    }
}
