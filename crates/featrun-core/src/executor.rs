//! Collaborator boundary.
//!
//! The runner never interprets steps. A [`ScenarioExecutor`] performs them
//! (HTTP calls, assertions, retries) and reports an outcome; a [`TagSource`]
//! reports the tags a spec can offer to the filter.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::domain::{Scenario, Spec, Tag};
use crate::error::ExecutorError;

/// What the collaborator reports for a scenario it ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioOutcome {
    Passed,
    Failed { detail: String },
}

impl ScenarioOutcome {
    pub fn failed(detail: impl Into<String>) -> Self {
        Self::Failed {
            detail: detail.into(),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Executes the steps of one scenario.
///
/// Returning `Err` records an execution error for the scenario; a panic is
/// caught by the coordinator and recorded the same way.
#[async_trait]
pub trait ScenarioExecutor: Send + Sync {
    async fn execute(&self, scenario: &Scenario) -> Result<ScenarioOutcome, ExecutorError>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "executor"
    }
}

/// Reports the set of tags available in a spec.
pub trait TagSource: Send + Sync {
    fn discover_tags(&self, spec: &Spec) -> BTreeSet<Tag>;
}

/// Tags as declared in the parsed spec: feature tags plus every scenario's
/// effective tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredTags;

impl TagSource for DeclaredTags {
    fn discover_tags(&self, spec: &Spec) -> BTreeSet<Tag> {
        let mut tags = spec.tags.clone();
        for scenario in &spec.scenarios {
            tags.extend(scenario.tags.iter().cloned());
        }
        tags
    }
}

/// Passes every scenario without running anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

#[async_trait]
impl ScenarioExecutor for DryRunExecutor {
    async fn execute(&self, _scenario: &Scenario) -> Result<ScenarioOutcome, ExecutorError> {
        Ok(ScenarioOutcome::Passed)
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}
