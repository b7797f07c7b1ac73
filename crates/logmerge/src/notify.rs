//! Run outcome notifications
//!
//! The orchestrator only knows the [`Notifier`] trait. [`WebhookNotifier`]
//! posts `{"text": ...}` to a Slack-style incoming webhook. Delivery
//! problems are logged and swallowed; they never change a host's outcome.

use async_trait::async_trait;
use logmerge_common::{LogMergeError, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::NotifyConfig;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a human-readable message. Never fails.
    async fn report(&self, text: &str);
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

pub struct WebhookNotifier {
    client: Client,
    url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(config: &NotifyConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LogMergeError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.webhook_url.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    async fn send(&self, url: &str, text: &str) -> Result<()> {
        let response = self
            .client
            .post(url)
            .json(&WebhookPayload { text })
            .send()
            .await
            .map_err(|e| LogMergeError::notification(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LogMergeError::notification(format!(
                "webhook returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn report(&self, text: &str) {
        let Some(url) = self.url.as_deref() else {
            warn!("No notification webhook configured, skipping message");
            return;
        };

        debug!("Sending notification");
        match self.send(url, text).await {
            Ok(()) => info!("Notification sent"),
            Err(e) => warn!(error = %e, "Failed to deliver notification"),
        }
    }
}
