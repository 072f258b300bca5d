//! Run results.
//!
//! A [`RunResult`] is assembled by a single writer through
//! [`RunResultBuilder`] and is read-only once finished. Entries are keyed by
//! scenario id, so the content does not depend on completion order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::spec::ScenarioId;
use crate::error::ScenarioError;

/// Terminal outcome of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed,
    /// The collaborator ran the scenario and reported a failure.
    Failed { detail: String },
    /// Execution error or timeout.
    Errored { error: ScenarioError },
    /// Never dispatched because the run was cancelled.
    Skipped,
}

impl ScenarioStatus {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Failed or errored.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Errored { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed { .. } => "failed",
            Self::Errored { error } => match error {
                ScenarioError::Execution { .. } => "error",
                ScenarioError::Timeout { .. } => "timeout",
            },
            Self::Skipped => "skipped",
        }
    }

    /// Diagnostic detail for failures.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Failed { detail } => Some(detail.clone()),
            Self::Errored { error } => Some(error.to_string()),
            Self::Passed | Self::Skipped => None,
        }
    }
}

/// Result entry for a single scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub id: ScenarioId,
    pub name: String,
    #[serde(flatten)]
    pub status: ScenarioStatus,
    pub duration_ms: u64,
}

impl ScenarioResult {
    pub fn new(id: ScenarioId, name: impl Into<String>, status: ScenarioStatus, duration_ms: u64) -> Self {
        Self {
            id,
            name: name.into(),
            status,
            duration_ms,
        }
    }

    pub fn skipped(id: ScenarioId, name: impl Into<String>) -> Self {
        Self::new(id, name, ScenarioStatus::Skipped, 0)
    }
}

/// One line of the per-worker execution log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub worker: usize,
    /// Position within the worker's own sequence, starting at 0.
    pub seq: u64,
    pub scenario: ScenarioId,
}

/// Aggregated outcome of a run.
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    results: BTreeMap<ScenarioId, ScenarioResult>,
    log: Vec<ExecutionLogEntry>,
    cancelled: bool,
}

impl RunResult {
    pub fn get(&self, id: &ScenarioId) -> Option<&ScenarioResult> {
        self.results.get(id)
    }

    /// Entries in scenario id order.
    pub fn iter(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.results.values()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn passed_count(&self) -> usize {
        self.iter().filter(|r| r.status.is_passed()).count()
    }

    /// Failed plus errored scenarios.
    pub fn failed_count(&self) -> usize {
        self.iter().filter(|r| r.status.is_failure()).count()
    }

    pub fn errored_count(&self) -> usize {
        self.iter()
            .filter(|r| matches!(r.status, ScenarioStatus::Errored { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.iter().filter(|r| r.status.is_skipped()).count()
    }

    /// Scenarios that were dispatched (anything but skipped).
    pub fn executed_count(&self) -> usize {
        self.len() - self.skipped_count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.iter().filter(|r| r.status.is_failure())
    }

    /// True when every executed scenario passed.
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Scenario id to status, without timing. Independent of worker count.
    pub fn outcomes(&self) -> BTreeMap<ScenarioId, ScenarioStatus> {
        self.results
            .iter()
            .map(|(id, r)| (id.clone(), r.status.clone()))
            .collect()
    }

    /// The full execution log in arrival order.
    pub fn log(&self) -> &[ExecutionLogEntry] {
        &self.log
    }

    /// Scenarios executed by one worker, in that worker's order.
    pub fn worker_log(&self, worker: usize) -> Vec<&ScenarioId> {
        let mut entries: Vec<&ExecutionLogEntry> =
            self.log.iter().filter(|e| e.worker == worker).collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| &e.scenario).collect()
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Append-only writer for a [`RunResult`].
#[derive(Debug, Default)]
pub struct RunResultBuilder {
    inner: RunResult,
}

impl RunResultBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scenario result. Returns `false` (and keeps the existing
    /// entry) if the scenario was already recorded.
    pub fn record(&mut self, result: ScenarioResult) -> bool {
        if self.inner.results.contains_key(&result.id) {
            return false;
        }
        self.inner.results.insert(result.id.clone(), result);
        true
    }

    pub fn log(&mut self, entry: ExecutionLogEntry) {
        self.inner.log.push(entry);
    }

    pub fn contains(&self, id: &ScenarioId) -> bool {
        self.inner.results.contains_key(id)
    }

    pub fn mark_cancelled(&mut self) {
        self.inner.cancelled = true;
    }

    pub fn finish(self) -> RunResult {
        self.inner
    }
}
