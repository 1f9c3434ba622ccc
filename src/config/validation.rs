// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use validator::Validate;

use super::core::AuthzConfig;

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate_authz_config(config: &AuthzConfig) -> Result<()> {
        config.validate()
            .context("Configuration validation failed")?;

        Self::validate_http_config(config)?;
        Self::validate_reporting_config(config)?;
        Self::validate_observability_config(config)?;

        Ok(())
    }

    fn validate_http_config(config: &AuthzConfig) -> Result<()> {
        if config.http.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Request timeout must be greater than 0"));
        }

        if config.http.pool_max_idle_per_host == 0 {
            return Err(anyhow::anyhow!("Idle pool size must be greater than 0"));
        }

        Ok(())
    }

    fn validate_reporting_config(config: &AuthzConfig) -> Result<()> {
        let Some(ref url) = config.reporting.webhook_url else {
            return Ok(());
        };

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "Webhook URL must start with http:// or https://"
            ));
        }

        for name in config.reporting.webhook_headers.keys() {
            if name.trim().is_empty() {
                return Err(anyhow::anyhow!("Webhook header names cannot be empty"));
            }
        }

        Ok(())
    }

    fn validate_observability_config(config: &AuthzConfig) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level = config.observability.log_level.to_lowercase();

        if !valid_levels.contains(&level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level '{}', expected one of: {}",
                config.observability.log_level,
                valid_levels.join(", ")
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigValidator::validate_authz_config(&AuthzConfig::default()).is_ok());
    }

    #[test]
    fn test_webhook_scheme_must_be_http() {
        let mut config = AuthzConfig::default();
        config.reporting.webhook_url = Some("ftp://hooks.example.com/authz".to_string());
        assert!(ConfigValidator::validate_authz_config(&config).is_err());

        config.reporting.webhook_url = Some("https://hooks.example.com/authz".to_string());
        assert!(ConfigValidator::validate_authz_config(&config).is_ok());
    }

    #[test]
    fn test_log_level_checked() {
        let mut config = AuthzConfig::default();
        config.observability.log_level = "loud".to_string();
        assert!(ConfigValidator::validate_authz_config(&config).is_err());

        config.observability.log_level = "DEBUG".to_string();
        assert!(ConfigValidator::validate_authz_config(&config).is_ok());
    }
}
