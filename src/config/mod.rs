// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod core;
pub mod loader;
pub mod validation;

pub use self::core::{AuthzConfig, HttpSettings, ObservabilityConfig, ReportingConfig};

pub use loader::{apply_env_overrides, apply_overrides_from, ConfigFormat, ConfigLoader};

pub use validation::ConfigValidator;

use anyhow::Result;
use std::path::Path;

impl AuthzConfig {
    /// Defaults plus environment overrides, validated
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        apply_env_overrides(&mut config)?;
        ConfigValidator::validate_authz_config(&config)?;
        Ok(config)
    }

    /// Load from a file when given, otherwise from the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => ConfigLoader::new(path)?.load_config(),
            None => Self::from_env(),
        }
    }
}
