//! Object store access
//!
//! The pipeline talks to storage only through [`ObjectStore`]. [`S3Store`]
//! is the production backend (any S3-compatible endpoint, R2 included);
//! [`memory::MemoryStore`] keeps objects in process.

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{BehaviorVersion, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    Client,
};
use logmerge_common::{LogMergeError, Result};
use tracing::{debug, info, instrument};

pub mod config;
pub mod memory;

pub use config::StorageConfig;

/// One listed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardEntry {
    pub key: String,
    pub size: Option<i64>,
}

/// One page of a listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub entries: Vec<ShardEntry>,
    /// Opaque token for the next page; `None` once the listing is exhausted.
    pub next_token: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one page of keys under `prefix`, in the store's listing order.
    async fn list_page(&self, prefix: &str, continuation: Option<&str>) -> Result<ListPage>;

    /// Fetch the full body of an object.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Write an object, replacing any existing one at `key`.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;

    /// Human-readable location of `key`, used in notifications.
    fn uri(&self, key: &str) -> String;
}

/// S3-compatible object store
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub fn new(config: &StorageConfig) -> Self {
        debug!("Initializing storage with config: {:?}", config);

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "logmerge-storage",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .force_path_style(config.path_style)
            .build();

        info!(bucket = %config.bucket, "Storage client initialized");

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    #[instrument(skip(self))]
    async fn list_page(&self, prefix: &str, continuation: Option<&str>) -> Result<ListPage> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .set_continuation_token(continuation.map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                LogMergeError::transfer(format!(
                    "Failed to list {}: {}",
                    self.uri(prefix),
                    DisplayErrorContext(&e)
                ))
            })?;

        let entries: Vec<ShardEntry> = response
            .contents()
            .iter()
            .filter_map(|obj| {
                obj.key().map(|key| ShardEntry {
                    key: key.to_string(),
                    size: obj.size(),
                })
            })
            .collect();

        let next_token = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        debug!(
            count = entries.len(),
            more = next_token.is_some(),
            "Listed page under {}",
            prefix
        );

        Ok(ListPage {
            entries,
            next_token,
        })
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                LogMergeError::transfer(format!(
                    "Failed to download {}: {}",
                    self.uri(key),
                    DisplayErrorContext(&e)
                ))
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| {
                LogMergeError::transfer(format!(
                    "Failed to read body of {}: {}",
                    self.uri(key),
                    e
                ))
            })?
            .into_bytes()
            .to_vec();

        debug!("Downloaded {} bytes from {}", data.len(), self.uri(key));

        Ok(data)
    }

    #[instrument(skip(self, body))]
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        let size = body.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                LogMergeError::transfer(format!(
                    "Failed to upload {}: {}",
                    self.uri(key),
                    DisplayErrorContext(&e)
                ))
            })?;

        info!("Uploaded {} bytes to {}", size, self.uri(key));

        Ok(())
    }

    fn uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}
