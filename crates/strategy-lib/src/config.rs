//! Raw strategy settings loading
//!
//! Layers an optional settings file, prefixed environment variables and
//! explicit caller overrides into the untyped mapping the registry validates.

use crate::settings::RawSettings;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// Default environment variable prefix (`KRR_HISTORY_DURATION=168`)
pub const DEFAULT_ENV_PREFIX: &str = "KRR";

/// Builder collecting raw strategy settings from their sources
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    env_prefix: Option<String>,
    env_vars: Option<config::Map<String, String>>,
    file: Option<PathBuf>,
    overrides: RawSettings,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self {
            env_prefix: Some(DEFAULT_ENV_PREFIX.to_string()),
            env_vars: None,
            file: None,
            overrides: RawSettings::new(),
        }
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Skip environment variables entirely
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// Read prefixed variables from `vars` instead of the process environment
    pub fn with_env_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Settings file, format picked from its extension
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Values applied last, above file and environment
    pub fn with_overrides(mut self, overrides: RawSettings) -> Self {
        self.overrides.extend(overrides);
        self
    }

    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Load and merge all sources
    pub fn load(&self) -> Result<RawSettings> {
        let mut builder = config::Config::builder();

        if let Some(path) = &self.file {
            builder = builder.add_source(config::File::from(path.as_path()).required(true));
        }
        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                config::Environment::with_prefix(prefix)
                    .try_parsing(true)
                    .source(self.env_vars.clone()),
            );
        }

        let merged = builder.build().context("Failed to read strategy settings sources")?;
        let values: HashMap<String, serde_json::Value> = merged
            .try_deserialize()
            .context("Failed to parse strategy settings")?;

        let mut raw: RawSettings = values.into_iter().collect();
        raw.extend(self.overrides.clone());

        debug!(keys = ?raw.keys().collect::<Vec<_>>(), "Loaded raw strategy settings");
        Ok(raw)
    }
}
