//! Compression and upload of merged artifacts

use chrono::NaiveDate;
use flate2::{write::GzEncoder, Compression};
use logmerge_common::{LogMergeError, Result};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::keys::{self, GZIP_CONTENT_TYPE};
use crate::merge::{remove_quietly, MergedArtifact};
use crate::storage::ObjectStore;

/// Outcome of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedObject {
    pub key: String,
    pub compressed_bytes: u64,
}

#[derive(Clone)]
pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    level: Compression,
}

impl Publisher {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            level: Compression::default(),
        }
    }

    pub fn with_level(mut self, level: Compression) -> Self {
        self.level = level;
        self
    }

    /// Compress `artifact`, upload it to `merged/<hostname>/<date>_merged.jsonl.gz`
    /// and delete both local files.
    ///
    /// Local files are removed whether or not the upload succeeded.
    #[instrument(skip(self, artifact, date), fields(date = %date, path = %artifact.path.display()))]
    pub async fn publish(
        &self,
        artifact: &MergedArtifact,
        hostname: &str,
        date: NaiveDate,
    ) -> Result<PublishedObject> {
        let gz_path = gzip_path(&artifact.path);
        let key = keys::merged_key(hostname, date);

        let result = self.compress_and_upload(&artifact.path, &gz_path, &key).await;

        remove_quietly(&artifact.path).await;
        remove_quietly(&gz_path).await;

        let compressed_bytes = result?;
        info!(
            key = %key,
            raw_bytes = artifact.bytes,
            compressed_bytes,
            "Published merged logs"
        );

        Ok(PublishedObject {
            key,
            compressed_bytes,
        })
    }

    async fn compress_and_upload(&self, src: &Path, dst: &Path, key: &str) -> Result<u64> {
        let level = self.level;
        let (src_owned, dst_owned) = (src.to_path_buf(), dst.to_path_buf());

        tokio::task::spawn_blocking(move || compress_file(&src_owned, &dst_owned, level))
            .await
            .map_err(|e| LogMergeError::compression(format!("compression task failed: {}", e)))?
            .map_err(|e| {
                LogMergeError::compression(format!("failed to gzip {}: {}", src.display(), e))
            })?;

        let body = tokio::fs::read(dst).await?;
        let size = body.len() as u64;

        self.store.put(key, body, GZIP_CONTENT_TYPE).await?;

        Ok(size)
    }
}

/// Sibling path of the compressed artifact (`<path>.gz`).
pub fn gzip_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".gz");
    PathBuf::from(name)
}

/// Stream `src` through a gzip encoder into `dst` in one pass.
fn compress_file(src: &Path, dst: &Path, level: Compression) -> io::Result<()> {
    let mut reader = BufReader::new(File::open(src)?);
    let mut encoder = GzEncoder::new(BufWriter::new(File::create(dst)?), level);

    io::copy(&mut reader, &mut encoder)?;

    let mut writer = encoder.finish()?;
    writer.flush()?;
    Ok(())
}
