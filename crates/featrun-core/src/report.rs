//! Run reports: the text summary and the JSON artifact.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::{RunResult, ScenarioResult};
use crate::gate::GateVerdict;

/// Schema version of the JSON artifact.
pub const REPORT_SCHEMA_VERSION: &str = "1.0";

/// Everything known about a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub profile: String,
    /// Tag expression in display form; empty when unfiltered.
    pub tags: String,
    pub workers: usize,
    pub plan_digest: String,
    pub specs_scanned: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub result: RunResult,
    pub verdict: GateVerdict,
}

impl RunReport {
    pub fn exit_code(&self) -> u8 {
        self.verdict.exit_code()
    }

    pub fn to_artifact(&self) -> RunReportArtifact {
        RunReportArtifact {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            run_id: self.run_id.clone(),
            profile: self.profile.clone(),
            tags: self.tags.clone(),
            workers: self.workers,
            plan_digest: self.plan_digest.clone(),
            started_at: self.started_at,
            duration_ms: self.duration_ms,
            cancelled: self.result.was_cancelled(),
            summary: SummaryArtifact {
                total: self.result.len(),
                passed: self.result.passed_count(),
                failed: self.result.failed_count(),
                errored: self.result.errored_count(),
                skipped: self.result.skipped_count(),
                overall_pass: self.verdict.passed,
            },
            scenarios: self.result.iter().cloned().collect(),
        }
    }
}

/// Counts section of the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryArtifact {
    pub total: usize,
    pub passed: usize,
    /// Failed plus errored.
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
    pub overall_pass: bool,
}

/// JSON artifact written by `--report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReportArtifact {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub run_id: String,
    pub profile: String,
    pub tags: String,
    pub workers: usize,
    pub plan_digest: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub cancelled: bool,
    pub summary: SummaryArtifact,
    pub scenarios: Vec<ScenarioResult>,
}

/// Write the artifact as pretty JSON.
pub fn write_report_json(path: &Path, report: &RunReport) -> Result<()> {
    let content =
        serde_json::to_string_pretty(&report.to_artifact()).context("serialize run report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render the human-readable summary.
pub fn render_summary(report: &RunReport) -> String {
    let result = &report.result;
    let mut out = String::new();
    out.push_str(&format!(
        "Run {} ({}, {} worker(s){})\n",
        report.run_id,
        report.profile,
        report.workers,
        if report.tags.is_empty() {
            String::new()
        } else {
            format!(", tags {}", report.tags)
        }
    ));
    out.push_str(&format!(
        "Scenarios: {} total, {} passed, {} failed, {} skipped",
        result.len(),
        result.passed_count(),
        result.failed_count(),
        result.skipped_count()
    ));
    if result.errored_count() > 0 {
        out.push_str(&format!(" ({} errored)", result.errored_count()));
    }
    out.push('\n');
    out.push_str(&format!("Duration: {}ms\n", report.duration_ms));
    if result.was_cancelled() {
        out.push_str("Run was cancelled; undispatched scenarios were skipped\n");
    }

    let failures: Vec<&ScenarioResult> = result.failures().collect();
    if !failures.is_empty() {
        out.push_str("\nFailures:\n");
        for failure in failures {
            out.push_str(&format!(
                "  ✗ {} {} [{}]: {}\n",
                failure.id,
                failure.name,
                failure.status.label(),
                failure.status.detail().unwrap_or_default()
            ));
        }
    }

    out.push_str(&format!(
        "\nStatus: {}\n",
        if report.verdict.passed {
            "✓ PASSED"
        } else {
            "✗ FAILED"
        }
    ));
    out
}
