//! In-memory object store
//!
//! Keeps objects in an ordered map so listings come back in lexicographic
//! key order, like S3. Listings are paginated with a configurable page size
//! and the continuation token is the last key of the previous page.
//!
//! Nothing is persisted; this backend is meant for tests and local dry runs.
//!
//! ```rust
//! use logmerge::storage::{memory::MemoryStore, ObjectStore};
//!
//! # async fn example() -> logmerge_common::Result<()> {
//! let store = MemoryStore::with_page_size(2);
//! store.insert("logs/web-01/2024-01-01T00.jsonl", r#"{"a":1}"#).await;
//!
//! let page = store.list_page("logs/", None).await?;
//! assert_eq!(page.entries.len(), 1);
//! assert!(page.next_token.is_none());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use logmerge_common::{LogMergeError, Result};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::trace;

use super::{ListPage, ObjectStore, ShardEntry};

/// Page size used by S3 `ListObjectsV2` when none is requested.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// A stored object and the content type it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// A store whose listings return at most `page_size` entries per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            page_size: page_size.max(1),
        }
    }

    /// Insert an object without a content type.
    pub async fn insert(&self, key: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.objects.write().await.insert(
            key.into(),
            StoredObject {
                body: body.into(),
                content_type: None,
            },
        );
    }

    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_page(&self, prefix: &str, continuation: Option<&str>) -> Result<ListPage> {
        let objects = self.objects.read().await;

        let lower = match continuation {
            Some(token) => Bound::Excluded(token.to_string()),
            None => Bound::Included(prefix.to_string()),
        };

        let mut matching = objects
            .range((lower, Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, obj)| ShardEntry {
                key: key.clone(),
                size: i64::try_from(obj.body.len()).ok(),
            });

        let entries: Vec<ShardEntry> = matching.by_ref().take(self.page_size).collect();
        let next_token = match (matching.next(), entries.last()) {
            (Some(_), Some(last)) => Some(last.key.clone()),
            _ => None,
        };

        trace!(prefix, count = entries.len(), "Listed in-memory page");

        Ok(ListPage {
            entries,
            next_token,
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|obj| obj.body.clone())
            .ok_or_else(|| LogMergeError::transfer(format!("NoSuchKey: {}", self.uri(key))))
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: Some(content_type.to_string()),
            },
        );
        Ok(())
    }

    fn uri(&self, key: &str) -> String {
        format!("memory://{}", key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded(page_size: usize) -> MemoryStore {
        let store = MemoryStore::with_page_size(page_size);
        for key in [
            "logs/b/2024-01-01T00.jsonl",
            "logs/a/2024-01-01T00.jsonl",
            "logs/a/2024-01-01T12.jsonl",
            "merged/a/2024-01-01_merged.jsonl.gz",
            "logsx/ignored",
        ] {
            store.insert(key, "{}").await;
        }
        store
    }

    #[tokio::test]
    async fn test_list_page_is_ordered_and_prefix_scoped() {
        let store = seeded(10).await;
        let page = store.list_page("logs/", None).await.unwrap();

        let keys: Vec<_> = page.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "logs/a/2024-01-01T00.jsonl",
                "logs/a/2024-01-01T12.jsonl",
                "logs/b/2024-01-01T00.jsonl",
            ]
        );
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn test_list_page_continuation() {
        let store = seeded(2).await;

        let first = store.list_page("logs/", None).await.unwrap();
        assert_eq!(first.entries.len(), 2);
        let token = first.next_token.expect("more pages");

        let second = store.list_page("logs/", Some(&token)).await.unwrap();
        assert_eq!(second.entries.len(), 1);
        assert_eq!(second.entries[0].key, "logs/b/2024-01-01T00.jsonl");
        assert!(second.next_token.is_none());
    }

    #[tokio::test]
    async fn test_exact_page_boundary_has_no_token() {
        let store = seeded(3).await;
        let page = store.list_page("logs/", None).await.unwrap();
        assert_eq!(page.entries.len(), 3);
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn test_get_missing_is_transfer_error() {
        let store = MemoryStore::new();
        let err = store.get("logs/nope").await.unwrap_err();
        assert!(matches!(err, LogMergeError::Transfer(_)));
    }

    #[tokio::test]
    async fn test_put_records_content_type() {
        let store = MemoryStore::new();
        store
            .put("merged/a/x.gz", vec![1, 2, 3], "application/gzip")
            .await
            .unwrap();

        let obj = store.object("merged/a/x.gz").await.unwrap();
        assert_eq!(obj.body, vec![1, 2, 3]);
        assert_eq!(obj.content_type.as_deref(), Some("application/gzip"));
    }
}
