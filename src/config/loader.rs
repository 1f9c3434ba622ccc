// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::core::AuthzConfig;
use super::validation::ConfigValidator;

pub struct ConfigLoader {
    config_path: PathBuf,
    format: ConfigFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigLoader {
    pub fn new<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref().to_path_buf();
        let format = Self::detect_format(&path)?;

        Ok(Self {
            config_path: path,
            format,
        })
    }

    pub fn with_format<P: AsRef<Path>>(config_path: P, format: ConfigFormat) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            format,
        }
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| anyhow::anyhow!("Could not determine config file format"))?;

        match extension {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            _ => Err(anyhow::anyhow!("Unsupported config file format: {}", extension)),
        }
    }

    pub fn format(&self) -> ConfigFormat {
        self.format
    }

    /// Parse the file, apply environment overrides, validate
    pub fn load_config(&self) -> Result<AuthzConfig> {
        let content = std::fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file: {:?}", self.config_path))?;

        let mut config: AuthzConfig = match self.format {
            ConfigFormat::Yaml => serde_yaml::from_str(&content)
                .context("Failed to parse YAML config")?,
            ConfigFormat::Toml => toml::from_str(&content)
                .context("Failed to parse TOML config")?,
            ConfigFormat::Json => serde_json::from_str(&content)
                .context("Failed to parse JSON config")?,
        };

        apply_env_overrides(&mut config)?;

        ConfigValidator::validate_authz_config(&config)?;

        Ok(config)
    }

    pub fn save_config(&self, config: &AuthzConfig) -> Result<()> {
        ConfigValidator::validate_authz_config(config)?;

        let content = match self.format {
            ConfigFormat::Yaml => serde_yaml::to_string(config)?,
            ConfigFormat::Toml => toml::to_string_pretty(config)?,
            ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        };

        std::fs::write(&self.config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", self.config_path))?;

        Ok(())
    }
}

/// Apply `AUTHZ_*` (and `ACCEPT_INVALID_CERTS`) variables from the process environment
pub fn apply_env_overrides(config: &mut AuthzConfig) -> Result<()> {
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides from any variable source
pub fn apply_overrides_from<F>(config: &mut AuthzConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(timeout) = lookup("AUTHZ_REQUEST_TIMEOUT_SECS") {
        config.http.request_timeout_secs = timeout.parse()
            .context("Invalid AUTHZ_REQUEST_TIMEOUT_SECS")?;
    }

    if let Some(retries) = lookup("AUTHZ_MAX_RETRIES") {
        config.http.max_retries = retries.parse()
            .context("Invalid AUTHZ_MAX_RETRIES")?;
    }

    if let Some(redirects) = lookup("AUTHZ_MAX_REDIRECTS") {
        config.http.max_redirects = redirects.parse()
            .context("Invalid AUTHZ_MAX_REDIRECTS")?;
    }

    if let Some(accept) = lookup("ACCEPT_INVALID_CERTS") {
        config.http.accept_invalid_certs = accept.parse().unwrap_or(false);
    }

    if let Some(url) = lookup("AUTHZ_WEBHOOK_URL") {
        config.reporting.webhook_url = Some(url);
    }

    if let Some(log_level) = lookup("AUTHZ_LOG_LEVEL") {
        config.observability.log_level = log_level;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn temp_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(
            ConfigLoader::detect_format(Path::new("authz.yaml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigLoader::detect_format(Path::new("authz.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigLoader::detect_format(Path::new("authz.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigLoader::detect_format(Path::new("authz.json")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigLoader::detect_format(Path::new("authz.ini")).is_err());
        assert!(ConfigLoader::detect_format(Path::new("authz")).is_err());
    }

    #[test]
    fn test_load_yaml_config() -> Result<()> {
        let file = temp_config(
            ".yaml",
            r#"
http:
  request_timeout_secs: 15
  max_redirects: 3
reporting:
  webhook_url: "https://hooks.example.com/authz"
  webhook_headers:
    x-api-key: "secret"
"#,
        );

        let config = ConfigLoader::new(file.path())?.load_config()?;
        assert_eq!(config.http.request_timeout_secs, 15);
        assert_eq!(config.http.max_redirects, 3);
        assert_eq!(config.http.max_retries, 1);
        assert_eq!(
            config.reporting.webhook_url.as_deref(),
            Some("https://hooks.example.com/authz")
        );
        Ok(())
    }

    #[test]
    fn test_load_toml_config() -> Result<()> {
        let file = temp_config(
            ".toml",
            r#"
[http]
max_retries = 4
pool_max_idle_per_host = 16

[observability]
log_level = "debug"
"#,
        );

        let config = ConfigLoader::new(file.path())?.load_config()?;
        assert_eq!(config.http.max_retries, 4);
        assert_eq!(config.http.pool_max_idle_per_host, 16);
        assert_eq!(config.observability.log_level, "debug");
        Ok(())
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let file = temp_config(".json", r#"{"http":{"request_timeout_secs":0}}"#);
        let loader = ConfigLoader::new(file.path()).unwrap();
        assert!(loader.load_config().is_err());
    }

    #[test]
    fn test_save_then_load() -> Result<()> {
        let file = temp_config(".json", "{}");
        let loader = ConfigLoader::new(file.path())?;

        let mut config = AuthzConfig::default();
        config.http.max_redirects = 2;
        loader.save_config(&config)?;

        assert_eq!(loader.load_config()?.http.max_redirects, 2);
        Ok(())
    }

    #[test]
    fn test_overrides_from_lookup() -> Result<()> {
        let vars: HashMap<&str, &str> = [
            ("AUTHZ_MAX_RETRIES", "5"),
            ("ACCEPT_INVALID_CERTS", "true"),
            ("AUTHZ_WEBHOOK_URL", "http://127.0.0.1:9000/hook"),
        ]
        .into_iter()
        .collect();

        let mut config = AuthzConfig::default();
        apply_overrides_from(&mut config, |key| vars.get(key).map(|v| v.to_string()))?;

        assert_eq!(config.http.max_retries, 5);
        assert!(config.http.accept_invalid_certs);
        assert_eq!(
            config.reporting.webhook_url.as_deref(),
            Some("http://127.0.0.1:9000/hook")
        );
        assert_eq!(config.http.request_timeout_secs, 30);
        Ok(())
    }

    #[test]
    fn test_bad_override_is_an_error() {
        let mut config = AuthzConfig::default();
        let result = apply_overrides_from(&mut config, |key| {
            (key == "AUTHZ_REQUEST_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }
}
