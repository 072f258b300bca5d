//! Pass/fail gate over a finished run.

use serde::{Deserialize, Serialize};

use crate::domain::RunResult;

/// Gate evaluation verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateVerdict {
    /// Whether every executed scenario passed.
    pub passed: bool,

    /// One entry per failed or errored scenario (empty if passed).
    pub violations: Vec<String>,

    /// Summary message.
    pub message: String,
}

impl GateVerdict {
    /// Process exit code: 0 when passed, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.passed {
            0
        } else {
            1
        }
    }
}

/// Run gate rules.
pub struct RunGate;

impl RunGate {
    /// Evaluate whether all executed scenarios passed.
    ///
    /// Gate rule:
    /// - every failed, errored or timed-out scenario is a violation
    /// - skipped scenarios are not executed and never violate the gate
    pub fn evaluate(result: &RunResult) -> GateVerdict {
        let violations: Vec<String> = result
            .failures()
            .map(|r| {
                format!(
                    "{} ({}) {}: {}",
                    r.id,
                    r.name,
                    r.status.label(),
                    r.status.detail().unwrap_or_default()
                )
            })
            .collect();

        let passed = violations.is_empty();
        let message = if passed {
            format!("All {} executed scenario(s) passed", result.executed_count())
        } else {
            format!("Gate failed with {} violation(s)", violations.len())
        };

        GateVerdict {
            passed,
            violations,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RunResultBuilder, ScenarioId, ScenarioResult, ScenarioStatus};
    use crate::error::ScenarioError;

    fn id(line: usize) -> ScenarioId {
        ScenarioId::new("g.feature", line)
    }

    #[test]
    fn test_empty_run_passes() {
        let verdict = RunGate::evaluate(&RunResultBuilder::new().finish());
        assert!(verdict.passed);
        assert_eq!(verdict.exit_code(), 0);
    }

    #[test]
    fn test_skipped_does_not_fail_gate() {
        let mut b = RunResultBuilder::new();
        b.record(ScenarioResult::new(id(1), "a", ScenarioStatus::Passed, 1));
        b.record(ScenarioResult::skipped(id(2), "b"));
        let verdict = RunGate::evaluate(&b.finish());
        assert!(verdict.passed);
        assert_eq!(verdict.message, "All 1 executed scenario(s) passed");
    }

    #[test]
    fn test_failures_and_timeouts_are_violations() {
        let mut b = RunResultBuilder::new();
        b.record(ScenarioResult::new(
            id(1),
            "create user",
            ScenarioStatus::Failed {
                detail: "status 500".to_string(),
            },
            1,
        ));
        b.record(ScenarioResult::new(
            id(2),
            "slow search",
            ScenarioStatus::Errored {
                error: ScenarioError::Timeout { limit_ms: 100 },
            },
            100,
        ));
        let verdict = RunGate::evaluate(&b.finish());

        assert!(!verdict.passed);
        assert_eq!(verdict.exit_code(), 1);
        assert_eq!(verdict.violations.len(), 2);
        assert_eq!(
            verdict.violations[0],
            "g.feature:1 (create user) failed: status 500"
        );
        assert!(verdict.violations[1].contains("timeout"));
    }
}
