//! Hostname discovery
//!
//! Scans everything under `logs/` once and reports which hosts wrote at
//! least one shard on the target date.

use chrono::NaiveDate;
use futures::TryStreamExt;
use logmerge_common::Result;
use std::collections::HashSet;
use std::pin::pin;
use tracing::{debug, info, instrument};

use crate::keys::{self, ShardKey, LOG_PREFIX};
use crate::lister::ShardLister;

#[derive(Clone)]
pub struct HostnameDiscoverer {
    lister: ShardLister,
}

impl HostnameDiscoverer {
    pub fn new(lister: ShardLister) -> Self {
        Self { lister }
    }

    /// Distinct hostnames with shards on `date`, in first-seen listing order.
    #[instrument(skip(self, date), fields(date = %date))]
    pub async fn discover(&self, date: NaiveDate) -> Result<Vec<String>> {
        let day = keys::date_str(date);
        let mut hosts = HostSet::default();
        let mut scanned = 0usize;

        let mut entries = pin!(self.lister.list(LOG_PREFIX));
        while let Some(entry) = entries.try_next().await? {
            scanned += 1;
            hosts.observe(&entry.key, &day);
        }

        let hostnames = hosts.into_vec();
        info!(
            scanned,
            hosts = hostnames.len(),
            "Discovered hostnames for {}",
            day
        );
        Ok(hostnames)
    }
}

/// Insertion-ordered set of hostnames.
#[derive(Default)]
struct HostSet {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl HostSet {
    fn observe(&mut self, key: &str, day: &str) {
        let Some(shard) = ShardKey::parse(key) else {
            debug!(key, "Skipping malformed shard key");
            return;
        };

        if shard.is_on(day) && self.seen.insert(shard.hostname.to_string()) {
            self.ordered.push(shard.hostname.to_string());
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}

/// Hostnames with shards on `day` among `keys`, in first-seen order.
pub fn hostnames_on<'a>(keys: impl IntoIterator<Item = &'a str>, day: &str) -> Vec<String> {
    let mut hosts = HostSet::default();
    for key in keys {
        hosts.observe(key, day);
    }
    hosts.into_vec()
}
