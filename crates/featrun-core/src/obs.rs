//! Structured lifecycle events for runs and scenarios.
//!
//! All events carry an `event` field so JSON log consumers can filter on it.
//! Enable JSON output with `--json`; tune verbosity with `RUST_LOG`.

use tracing::{debug, info, warn};

use crate::domain::{ScenarioId, ScenarioStatus};

/// Run-scoped span; attach it to the run future with `Instrument`.
pub fn run_span(run_id: &str, profile: &str) -> tracing::Span {
    tracing::info_span!("featrun.run", run_id = %run_id, profile = %profile)
}

pub fn emit_run_started(run_id: &str, profile: &str, workers: usize, tags: &str) {
    info!(
        event = "run.started",
        run_id = %run_id,
        profile = %profile,
        workers = workers,
        tags = %tags,
    );
}

/// Emit event: scenarios selected for execution.
pub fn emit_run_planned(run_id: &str, specs: usize, scenarios: usize, plan_digest: &str) {
    info!(
        event = "run.planned",
        run_id = %run_id,
        specs = specs,
        scenarios = scenarios,
        plan_digest = %plan_digest,
    );
}

pub fn emit_scenario_dispatched(worker: usize, scenario: &ScenarioId) {
    debug!(event = "scenario.dispatched", worker = worker, scenario = %scenario);
}

pub fn emit_scenario_finished(
    worker: usize,
    scenario: &ScenarioId,
    status: &ScenarioStatus,
    duration_ms: u64,
) {
    if status.is_failure() {
        warn!(
            event = "scenario.finished",
            worker = worker,
            scenario = %scenario,
            status = status.label(),
            duration_ms = duration_ms,
            detail = %status.detail().unwrap_or_default(),
        );
    } else {
        info!(
            event = "scenario.finished",
            worker = worker,
            scenario = %scenario,
            status = status.label(),
            duration_ms = duration_ms,
        );
    }
}

/// Emit event: cancellation observed; `pending` scenarios will be skipped.
pub fn emit_run_cancelled(pending: usize) {
    warn!(event = "run.cancelled", pending = pending);
}

pub fn emit_run_finished(run_id: &str, duration_ms: u64, passed: usize, failed: usize, skipped: usize) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        passed = passed,
        failed = failed,
        skipped = skipped,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScenarioError;

    #[test]
    fn test_emitters_do_not_panic_without_subscriber() {
        let _span = run_span("run-1", "smoke").entered();
        let id = ScenarioId::new("a.feature", 3);
        emit_run_started("run-1", "smoke", 1, "@smoke");
        emit_run_planned("run-1", 1, 1, "abc");
        emit_scenario_dispatched(0, &id);
        emit_scenario_finished(0, &id, &ScenarioStatus::Passed, 4);
        emit_scenario_finished(
            0,
            &id,
            &ScenarioStatus::Errored {
                error: ScenarioError::Timeout { limit_ms: 5 },
            },
            5,
        );
        emit_run_cancelled(2);
        emit_run_finished("run-1", 10, 1, 1, 0);
    }
}
