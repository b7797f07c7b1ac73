//! Daily merge orchestrator
//!
//! Computes the target day, discovers hosts, then merges and publishes each
//! host in turn. A failing host is reported and skipped; the run always
//! attempts every discovered host.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use logmerge_common::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::config::Config;
use crate::discovery::HostnameDiscoverer;
use crate::lister::ShardLister;
use crate::merge::MergeEngine;
use crate::notify::Notifier;
use crate::publish::Publisher;
use crate::storage::ObjectStore;

/// The calendar day before `now`, in UTC.
pub fn yesterday(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive() - Duration::days(1)
}

/// Result of processing one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOutcome {
    Published { hostname: String, key: String },
    Failed { hostname: String, message: String },
}

impl HostOutcome {
    pub fn hostname(&self) -> &str {
        match self {
            HostOutcome::Published { hostname, .. } | HostOutcome::Failed { hostname, .. } => {
                hostname
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, HostOutcome::Failed { .. })
    }
}

/// Outcomes of one run, in processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub date: NaiveDate,
    pub outcomes: Vec<HostOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.len() - self.failed()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

pub fn success_message(hostname: &str, date: NaiveDate, location: &str) -> String {
    format!(
        "✅ Merged logs for `{}` on `{}`\n📦 Uploaded to `{}`",
        hostname, date, location
    )
}

pub fn failure_message(hostname: &str, error: &str) -> String {
    format!("❌ Failed to merge logs for `{}`: {}", hostname, error)
}

pub struct Orchestrator {
    store: Arc<dyn ObjectStore>,
    discoverer: HostnameDiscoverer,
    engine: MergeEngine,
    publisher: Publisher,
    notifier: Arc<dyn Notifier>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        notifier: Arc<dyn Notifier>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            discoverer: HostnameDiscoverer::new(ShardLister::new(Arc::clone(&store))),
            engine: MergeEngine::new(Arc::clone(&store), work_dir),
            publisher: Publisher::new(Arc::clone(&store)),
            store,
            notifier,
        }
    }

    pub fn from_config(
        config: &Config,
        store: Arc<dyn ObjectStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::new(store, notifier, config.merge.work_dir.clone())
    }

    /// Merge yesterday's (UTC) shards.
    pub async fn run_yesterday(&self) -> Result<RunReport> {
        self.run(yesterday(Utc::now())).await
    }

    /// Merge every host that has shards on `date`.
    ///
    /// Only a failed discovery listing is returned as an error; per-host
    /// failures end up in the report.
    #[instrument(skip(self, date), fields(date = %date))]
    pub async fn run(&self, date: NaiveDate) -> Result<RunReport> {
        info!("Merging logs for {}", date);

        let hostnames = match self.discoverer.discover(date).await {
            Ok(hostnames) => hostnames,
            Err(e) => {
                error!(error = %e, "Hostname discovery failed");
                self.notifier
                    .report(&format!("❌ Failed to discover hostnames for `{}`: {}", date, e))
                    .await;
                return Err(e);
            },
        };

        info!(hosts = ?hostnames, "Found hostnames");

        let mut outcomes = Vec::with_capacity(hostnames.len());
        for hostname in hostnames {
            let outcome = match self.process_host(&hostname, date).await {
                Ok(key) => {
                    info!("✓ {} merged to {}", hostname, key);
                    self.notifier
                        .report(&success_message(&hostname, date, &self.store.uri(&key)))
                        .await;
                    HostOutcome::Published { hostname, key }
                },
                Err(e) => {
                    error!("✗ Failed to merge logs for {}: {}", hostname, e);
                    let message = e.to_string();
                    self.notifier
                        .report(&failure_message(&hostname, &message))
                        .await;
                    HostOutcome::Failed { hostname, message }
                },
            };
            outcomes.push(outcome);
        }

        let report = RunReport { date, outcomes };
        info!(
            "Merge run for {} completed: {} succeeded, {} failed",
            date,
            report.succeeded(),
            report.failed()
        );

        Ok(report)
    }

    /// Merge and publish one host, returning the published key.
    pub async fn process_host(&self, hostname: &str, date: NaiveDate) -> Result<String> {
        let artifact = self.engine.merge(hostname, date).await?;
        let published = self.publisher.publish(&artifact, hostname, date).await?;
        Ok(published.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_yesterday_is_previous_utc_day() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 30, 0).unwrap();
        assert_eq!(yesterday(now), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        let late = Utc.with_ymd_and_hms(2024, 1, 2, 23, 59, 59).unwrap();
        assert_eq!(yesterday(late), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_yesterday_crosses_month_and_year() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(yesterday(now), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let new_year = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            yesterday(new_year),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_messages() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            success_message("host1", date, "s3://b/merged/host1/2024-01-01_merged.jsonl.gz"),
            "✅ Merged logs for `host1` on `2024-01-01`\n📦 Uploaded to `s3://b/merged/host1/2024-01-01_merged.jsonl.gz`"
        );
        assert_eq!(
            failure_message("host1", "No logs found for host1"),
            "❌ Failed to merge logs for `host1`: No logs found for host1"
        );
    }

    #[test]
    fn test_report_counts() {
        let report = RunReport {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            outcomes: vec![
                HostOutcome::Published {
                    hostname: "a".to_string(),
                    key: "merged/a/2024-01-01_merged.jsonl.gz".to_string(),
                },
                HostOutcome::Failed {
                    hostname: "b".to_string(),
                    message: "boom".to_string(),
                },
            ],
        };
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
        assert_eq!(report.outcomes[1].hostname(), "b");
    }
}
