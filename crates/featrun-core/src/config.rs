//! Runner configuration (`featrun.toml`).
//!
//! Resolution order: explicit path, then `./featrun.toml`, then defaults.
//! `FEATRUN_ENV` overrides the `env` key; callers apply CLI overrides last.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::loader::DEFAULT_EXTENSION;

/// Conventional config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "featrun.toml";

/// Environment variable selecting the target environment.
pub const ENV_VAR: &str = "FEATRUN_ENV";

/// Default worker count for the parallel profiles.
pub const DEFAULT_WORKERS: usize = 5;

/// Per-environment settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentConfig {
    pub base_url: Option<String>,
}

/// HTTP settings forwarded verbatim to the collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSettings {
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub retry_count: u32,
    pub retry_interval_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            read_timeout_ms: 10_000,
            retry_count: 3,
            retry_interval_ms: 1_000,
        }
    }
}

/// Command used by the process collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Program followed by its arguments. Placeholders: `{feature}`, `{line}`, `{name}`.
    pub command: Vec<String>,
}

/// Full runner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    pub features_dir: PathBuf,
    pub extensions: Vec<String>,
    pub default_workers: usize,
    pub scenario_timeout_ms: Option<u64>,
    pub env: String,
    pub environments: BTreeMap<String, EnvironmentConfig>,
    pub http: HttpSettings,
    pub executor: ExecutorConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            features_dir: PathBuf::from("."),
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            default_workers: DEFAULT_WORKERS,
            scenario_timeout_ms: None,
            env: "dev".to_string(),
            environments: BTreeMap::new(),
            http: HttpSettings::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Parse TOML text; `origin` is only used in error messages.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load an explicit config file. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Resolve the config: `explicit` if given, else `dir/featrun.toml` if it
    /// exists, else defaults. Applies `FEATRUN_ENV` from the process environment.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => {
                let candidate = dir.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::load(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(env) = lookup(ENV_VAR).filter(|v| !v.trim().is_empty()) {
            self.env = env.trim().to_string();
        }
    }

    /// Check invariants that deserialization cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_workers == 0 {
            return Err(ConfigError::Invalid(
                "default_workers must be at least 1".to_string(),
            ));
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "extensions must list at least one file extension".to_string(),
            ));
        }
        if self.scenario_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "scenario_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if !self.environments.is_empty() && !self.environments.contains_key(&self.env) {
            let known: Vec<&str> = self.environments.keys().map(String::as_str).collect();
            return Err(ConfigError::Invalid(format!(
                "unknown environment '{}' (known: {})",
                self.env,
                known.join(", ")
            )));
        }
        if self.executor.command.first().is_some_and(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "executor command program is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL of the selected environment, if declared.
    pub fn base_url(&self) -> Option<&str> {
        self.environments
            .get(&self.env)
            .and_then(|e| e.base_url.as_deref())
    }

    pub fn scenario_timeout(&self) -> Option<Duration> {
        self.scenario_timeout_ms.map(Duration::from_millis)
    }
}
