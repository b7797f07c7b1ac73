//! Merge engine
//!
//! Concatenates every shard of one host and day into a local
//! newline-delimited file, fetching shards one at a time in listing order.

use chrono::NaiveDate;
use futures::TryStreamExt;
use logmerge_common::{LogMergeError, Result};
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use crate::keys;
use crate::lister::ShardLister;
use crate::storage::ObjectStore;

/// Local result of merging one host's shards for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedArtifact {
    pub path: PathBuf,
    pub shard_count: usize,
    /// Bytes written, separators included.
    pub bytes: u64,
}

#[derive(Clone)]
pub struct MergeEngine {
    lister: ShardLister,
    store: Arc<dyn ObjectStore>,
    work_dir: PathBuf,
}

impl MergeEngine {
    pub fn new(store: Arc<dyn ObjectStore>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            lister: ShardLister::new(Arc::clone(&store)),
            store,
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Local path of the merged artifact for `hostname` on `date`.
    pub fn artifact_path(&self, hostname: &str, date: NaiveDate) -> PathBuf {
        self.work_dir
            .join(hostname)
            .join(keys::merged_file_name(date))
    }

    /// Merge all shards under `logs/<hostname>/<date>` into one local file.
    ///
    /// The artifact is recreated on every call, so a rerun never appends to
    /// leftovers of an earlier attempt. Fails with
    /// [`LogMergeError::EmptyHost`] when no shard matches.
    #[instrument(skip(self, date), fields(date = %date))]
    pub async fn merge(&self, hostname: &str, date: NaiveDate) -> Result<MergedArtifact> {
        let path = self.artifact_path(hostname, date);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let written = self.write_shards(hostname, date, &path).await;
        let (shard_count, bytes) = match written {
            Ok(counts) => counts,
            Err(e) => {
                remove_quietly(&path).await;
                return Err(e);
            },
        };

        if shard_count == 0 {
            remove_quietly(&path).await;
            return Err(LogMergeError::empty_host(hostname));
        }

        info!(
            shards = shard_count,
            bytes,
            path = %path.display(),
            "Merged shards"
        );

        Ok(MergedArtifact {
            path,
            shard_count,
            bytes,
        })
    }

    async fn write_shards(
        &self,
        hostname: &str,
        date: NaiveDate,
        path: &Path,
    ) -> Result<(usize, u64)> {
        let mut out = BufWriter::new(File::create(path).await?);
        let mut shard_count = 0usize;
        let mut bytes = 0u64;

        let prefix = keys::shard_prefix(hostname, date);
        let mut shards = pin!(self.lister.list(&prefix));

        while let Some(shard) = shards.try_next().await? {
            debug!(key = %shard.key, size = ?shard.size, "Fetching shard");
            let body = self.store.get(&shard.key).await?;

            out.write_all(&body).await?;
            out.write_all(b"\n").await?;

            shard_count += 1;
            bytes += body.len() as u64 + 1;
        }

        out.flush().await?;
        out.into_inner().sync_all().await?;

        Ok((shard_count, bytes))
    }
}

/// Best-effort removal of a local intermediate.
pub(crate) async fn remove_quietly(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed local file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove local file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    async fn engine_with(shards: &[(&str, &str)], page_size: usize) -> (MergeEngine, tempfile::TempDir) {
        let store = MemoryStore::with_page_size(page_size);
        for (key, body) in shards {
            store.insert(*key, *body).await;
        }
        let dir = tempfile::tempdir().unwrap();
        (MergeEngine::new(Arc::new(store), dir.path()), dir)
    }

    #[tokio::test]
    async fn test_merge_single_shard() {
        let (engine, _dir) = engine_with(&[("logs/h/2024-01-01T00.jsonl", r#"{"a":1}"#)], 10).await;

        let artifact = engine.merge("h", day()).await.unwrap();
        assert_eq!(artifact.shard_count, 1);
        assert_eq!(artifact.bytes, 8);
        assert_eq!(std::fs::read_to_string(&artifact.path).unwrap(), "{\"a\":1}\n");
    }

    #[tokio::test]
    async fn test_merge_many_shards_in_listing_order() {
        let (engine, _dir) = engine_with(
            &[
                ("logs/h/2024-01-01T12.jsonl", "{\"t\":12}"),
                ("logs/h/2024-01-01T00.jsonl", "{\"t\":0}\n{\"t\":1}"),
                ("logs/h/2024-01-01T06.jsonl", "{\"t\":6}"),
                ("logs/h/2024-01-02T00.jsonl", "{\"t\":\"next day\"}"),
                ("logs/other/2024-01-01T00.jsonl", "{\"t\":\"other host\"}"),
            ],
            2,
        )
        .await;

        let artifact = engine.merge("h", day()).await.unwrap();
        assert_eq!(artifact.shard_count, 3);
        assert_eq!(
            std::fs::read_to_string(&artifact.path).unwrap(),
            "{\"t\":0}\n{\"t\":1}\n{\"t\":6}\n{\"t\":12}\n"
        );
        assert_eq!(
            artifact.path,
            engine.work_dir().join("h").join("2024-01-01_merged.jsonl")
        );
    }

    #[tokio::test]
    async fn test_merge_zero_shards_is_empty_host() {
        let (engine, _dir) = engine_with(&[("logs/h/2023-12-31T00.jsonl", "{}")], 10).await;

        let err = engine.merge("h", day()).await.unwrap_err();
        assert!(matches!(err, LogMergeError::EmptyHost { ref hostname } if hostname == "h"));
        assert!(!engine.artifact_path("h", day()).exists());
    }

    #[tokio::test]
    async fn test_merge_truncates_stale_artifact() {
        let (engine, _dir) = engine_with(&[("logs/h/2024-01-01T00.jsonl", "fresh")], 10).await;

        let path = engine.artifact_path("h", day());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "stale line from an earlier run\n").unwrap();

        engine.merge("h", day()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh\n");

        // A second run produces the same bytes rather than doubling them.
        engine.merge("h", day()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh\n");
    }
}
