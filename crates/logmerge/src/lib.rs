//! logmerge
//!
//! Daily batch job that merges per-host log shards from an object store into
//! one gzip-compressed JSON Lines file per host and day.
//!
//! # Pipeline
//!
//! 1. [`discovery::HostnameDiscoverer`] lists `logs/` and finds every host
//!    with shards on the target day.
//! 2. [`merge::MergeEngine`] re-lists `logs/<host>/<date>` and concatenates
//!    the shards into a local file, one shard body plus `\n` at a time.
//! 3. [`publish::Publisher`] gzips that file, uploads it to
//!    `merged/<host>/<date>_merged.jsonl.gz` and removes local files.
//! 4. [`orchestrator::Orchestrator`] drives the above for each host and
//!    reports every outcome through a [`notify::Notifier`].
//!
//! # Example
//!
//! ```no_run
//! use logmerge::{config::Config, notify::WebhookNotifier, orchestrator::Orchestrator};
//! use logmerge::storage::S3Store;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load(None)?;
//! let store = Arc::new(S3Store::new(&config.storage));
//! let notifier = Arc::new(WebhookNotifier::new(&config.notify)?);
//!
//! let report = Orchestrator::from_config(&config, store, notifier)
//!     .run_yesterday()
//!     .await?;
//! println!("{} hosts failed", report.failed());
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod discovery;
pub mod keys;
pub mod lister;
pub mod merge;
pub mod notify;
pub mod orchestrator;
pub mod publish;
pub mod storage;

pub use logmerge_common::{LogMergeError, Result};
