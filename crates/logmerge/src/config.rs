//! Configuration management
//!
//! Settings come from the process environment, falling back to an env file.
//! Process variables always win over the file.

use logmerge_common::{LogMergeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::storage::config::{StorageConfig, DEFAULT_REGION};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default local directory for merged artifacts.
pub const DEFAULT_WORK_DIR: &str = "merged";

/// Default timeout for notification requests in seconds.
pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 10;

/// Full job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub notify: NotifyConfig,
    pub merge: MergeConfig,
}

/// Notification endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Incoming webhook URL; notifications are skipped when unset.
    pub webhook_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: DEFAULT_NOTIFY_TIMEOUT_SECS,
        }
    }
}

/// Local merge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    pub work_dir: PathBuf,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
        }
    }
}

impl Config {
    /// Load configuration from the environment and an optional env file
    ///
    /// Without an explicit `env_file` a `.env` in the working directory (or
    /// a parent) is used when present.
    pub fn load(env_file: Option<&Path>) -> Result<Self> {
        let file_vars = read_env_file(env_file)?;
        Self::from_lookup(|name| {
            std::env::var(name)
                .ok()
                .or_else(|| file_vars.get(name).cloned())
        })
    }

    /// Build configuration from an arbitrary variable lookup
    ///
    /// Empty values count as unset. Every missing required variable is
    /// reported in a single [`LogMergeError::Config`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| lookup(*name).filter(|v| !v.trim().is_empty()))
        };

        let mut missing = Vec::new();
        let mut require = |names: &[&'static str]| {
            get(names).unwrap_or_else(|| {
                missing.push(names[0]);
                String::new()
            })
        };

        let endpoint = require(&["R2_ENDPOINT", "S3_ENDPOINT"]);
        let access_key = require(&["R2_ACCESS_KEY_ID", "S3_ACCESS_KEY"]);
        let secret_key = require(&["R2_SECRET_ACCESS_KEY", "S3_SECRET_KEY"]);
        let bucket = require(&["R2_BUCKET", "S3_BUCKET"]);

        if !missing.is_empty() {
            return Err(LogMergeError::config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        let path_style = match get(&["S3_PATH_STYLE"]) {
            Some(v) => parse_bool("S3_PATH_STYLE", &v)?,
            None => false,
        };

        let timeout_secs = match get(&["NOTIFY_TIMEOUT_SECS"]) {
            Some(v) => v.trim().parse().map_err(|_| {
                LogMergeError::config(format!("NOTIFY_TIMEOUT_SECS must be a number, got '{}'", v))
            })?,
            None => DEFAULT_NOTIFY_TIMEOUT_SECS,
        };

        let config = Config {
            storage: StorageConfig {
                endpoint,
                region: get(&["R2_REGION", "S3_REGION"])
                    .unwrap_or_else(|| DEFAULT_REGION.to_string()),
                bucket,
                access_key,
                secret_key,
                path_style,
            },
            notify: NotifyConfig {
                webhook_url: get(&["SLACK_WEBHOOK_URL", "NOTIFY_WEBHOOK_URL"]),
                timeout_secs,
            },
            merge: MergeConfig {
                work_dir: get(&["MERGE_WORK_DIR"])
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_WORK_DIR)),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.storage.endpoint.starts_with("http://")
            && !self.storage.endpoint.starts_with("https://")
        {
            return Err(LogMergeError::config(format!(
                "store endpoint must be an http(s) URL, got '{}'",
                self.storage.endpoint
            )));
        }

        if self.notify.timeout_secs == 0 {
            return Err(LogMergeError::config(
                "NOTIFY_TIMEOUT_SECS must be greater than 0",
            ));
        }

        if self.notify.webhook_url.is_none() {
            warn!("No notification webhook configured - outcomes will only be logged");
        }

        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(LogMergeError::config(format!(
            "{} must be true or false, got '{}'",
            name, other
        ))),
    }
}

fn read_env_file(path: Option<&Path>) -> Result<HashMap<String, String>> {
    let iter = match path {
        Some(path) => dotenvy::from_path_iter(path).map_err(|e| {
            LogMergeError::config(format!("failed to read env file {}: {}", path.display(), e))
        })?,
        None => match dotenvy::dotenv_iter() {
            Ok(iter) => iter,
            Err(e) if e.not_found() => return Ok(HashMap::new()),
            Err(e) => {
                return Err(LogMergeError::config(format!("failed to read .env: {}", e)));
            },
        },
    };

    let mut vars = HashMap::new();
    for item in iter {
        let (key, value) =
            item.map_err(|e| LogMergeError::config(format!("invalid env file entry: {}", e)))?;
        vars.insert(key, value);
    }

    debug!(count = vars.len(), "Loaded env file variables");
    Ok(vars)
}
