// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct AuthzConfig {
    #[validate(nested)]
    #[serde(default)]
    pub http: HttpSettings,

    #[validate(nested)]
    #[serde(default)]
    pub reporting: ReportingConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Replay transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct HttpSettings {
    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Retries apply to timeouts and connection resets only
    #[validate(range(min = 0, max = 10))]
    #[serde(default = "default_retries")]
    pub max_retries: u32,

    /// 0 disables redirect following
    #[validate(range(min = 0, max = 20))]
    #[serde(default)]
    pub max_redirects: usize,

    #[validate(range(min = 1, max = 1000))]
    #[serde(default = "default_pool_idle")]
    pub pool_max_idle_per_host: usize,

    #[serde(default = "default_false")]
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ReportingConfig {
    #[validate(url)]
    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default)]
    pub webhook_headers: HashMap<String, String>,

    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_webhook_timeout")]
    pub webhook_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_timeout(),
            max_retries: default_retries(),
            max_redirects: 0,
            pool_max_idle_per_host: default_pool_idle(),
            accept_invalid_certs: false,
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            webhook_headers: HashMap::new(),
            webhook_timeout_secs: default_webhook_timeout(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    1
}

fn default_pool_idle() -> usize {
    8
}

fn default_false() -> bool {
    false
}

fn default_webhook_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthzConfig::default();
        assert_eq!(config.http.request_timeout_secs, 30);
        assert_eq!(config.http.max_retries, 1);
        assert_eq!(config.http.max_redirects, 0);
        assert_eq!(config.http.pool_max_idle_per_host, 8);
        assert!(!config.http.accept_invalid_certs);
        assert!(config.reporting.webhook_url.is_none());
        assert_eq!(config.reporting.webhook_timeout_secs, 10);
        assert_eq!(config.observability.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config: AuthzConfig = serde_json::from_str(r#"{"http":{"max_retries":3}}"#).unwrap();
        assert_eq!(config.http.max_retries, 3);
        assert_eq!(config.http.request_timeout_secs, 30);
        assert_eq!(config.reporting, ReportingConfig::default());
    }

    #[test]
    fn test_range_validation() {
        let mut config = AuthzConfig::default();
        config.http.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AuthzConfig::default();
        config.http.max_retries = 11;
        assert!(config.validate().is_err());

        let mut config = AuthzConfig::default();
        config.reporting.webhook_url = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }
}
