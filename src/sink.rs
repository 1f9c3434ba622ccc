// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Findings delivery
//!
//! Every executed test is forwarded to a sink as a flat [`Finding`]. The
//! shape consumed downstream is `{user, resource_id, action, variant}`; the
//! remaining fields are informational.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::config::ReportingConfig;

/// Flat, serializable view of a test result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    /// `name:role` of the substituted identity
    pub user: String,
    pub resource_id: Option<String>,
    /// `METHOD url`
    pub action: String,
    pub variant: String,
    pub type_name: Option<String>,
    pub status_code: Option<u16>,
    pub outcome: String,
    /// Substituted identity was granted access
    pub candidate: bool,
    pub discovered_at: DateTime<Utc>,
}

/// Destination for findings
#[async_trait::async_trait]
pub trait FindingsSink: Send + Sync {
    async fn report(&self, finding: &Finding) -> Result<()>;

    fn name(&self) -> &str;
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

#[async_trait::async_trait]
impl FindingsSink for NoopSink {
    async fn report(&self, _finding: &Finding) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "noop"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    pub method: String,
    pub headers: Option<HashMap<String, String>>,
}

impl WebhookConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            method: "POST".to_string(),
            headers: None,
        }
    }

    /// Webhook settings from the reporting section, if a URL is configured
    pub fn from_reporting(reporting: &ReportingConfig) -> Option<Self> {
        let url = reporting.webhook_url.as_ref()?;
        Some(Self {
            url: url.clone(),
            method: "POST".to_string(),
            headers: if reporting.webhook_headers.is_empty() {
                None
            } else {
                Some(reporting.webhook_headers.clone())
            },
        })
    }
}

/// POSTs each finding as JSON to a webhook
pub struct WebhookSink {
    config: WebhookConfig,
    http_client: Client,
}

impl WebhookSink {
    pub fn new(config: WebhookConfig, timeout_secs: u64) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create webhook client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl FindingsSink for WebhookSink {
    async fn report(&self, finding: &Finding) -> Result<()> {
        let method = reqwest::Method::from_bytes(self.config.method.to_uppercase().as_bytes())
            .context("Invalid webhook method")?;

        let mut request = self
            .http_client
            .request(method, &self.config.url)
            .json(finding);

        if let Some(ref headers) = self.config.headers {
            for (key, value) in headers {
                request = request.header(key, value);
            }
        }

        request
            .send()
            .await
            .context("Failed to send webhook")?
            .error_for_status()
            .context("Webhook rejected finding")?;

        debug!("[Sink] Delivered finding {} to {}", finding.id, self.config.url);
        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }
}
