//! Error taxonomy.
//!
//! Fatal errors (`DiscoveryError`, `InvalidTagExpressionError`, `ConfigError`)
//! abort a run before any scenario executes and surface as [`FeatrunError`].
//! Per-scenario errors ([`ScenarioError`]) are recorded in the run result and
//! never abort sibling scenarios.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Spec discovery failed.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("spec root does not exist: {}", root.display())]
    RootNotFound { root: PathBuf },

    #[error("spec root is not a readable directory: {}: {reason}", root.display())]
    RootNotReadable { root: PathBuf, reason: String },

    #[error("failed to walk {}: {reason}", path.display())]
    Walk { path: PathBuf, reason: String },

    #[error("failed to read spec {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

/// A tag expression could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid tag expression '{expression}': {reason}")]
pub struct InvalidTagExpressionError {
    pub expression: String,
    pub reason: String,
}

impl InvalidTagExpressionError {
    pub fn new(expression: &str, reason: impl Into<String>) -> Self {
        Self {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}

/// Runner configuration is unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors raised by a scenario collaborator call.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("executor i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// A per-scenario error recorded in the run result.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioError {
    /// The collaborator failed or the worker running the scenario crashed.
    #[error("execution error: {detail}")]
    Execution { detail: String },

    /// The scenario exceeded its time budget.
    #[error("timed out after {limit_ms}ms")]
    Timeout { limit_ms: u64 },
}

/// Top-level fatal error for a run.
#[derive(Debug, Error)]
pub enum FeatrunError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    InvalidTagExpression(#[from] InvalidTagExpressionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl FeatrunError {
    /// Process exit code for a fatal error.
    pub fn exit_code(&self) -> u8 {
        2
    }
}

/// Result type for fatal run operations.
pub type Result<T> = std::result::Result<T, FeatrunError>;
