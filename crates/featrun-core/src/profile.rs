//! Canned run profiles.

use crate::config::DEFAULT_WORKERS;
use crate::domain::TagExpression;
use crate::error::InvalidTagExpressionError;

/// Tag excluded by the parallel profile.
pub const IGNORE_TAG: &str = "ignore";
/// Tag required by the smoke profile.
pub const SMOKE_TAG: &str = "smoke";
/// Tag required by the regression profile.
pub const REGRESSION_TAG: &str = "regression";

/// How a run selects scenarios and how many workers it uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunProfile {
    /// Every scenario, one worker.
    All,
    /// Everything not tagged `@ignore`.
    Parallel { workers: usize },
    /// Scenarios tagged `@smoke`, one worker.
    Smoke,
    /// Scenarios tagged `@regression`.
    Regression { workers: usize },
    /// Arbitrary tag expression.
    Custom {
        expression: TagExpression,
        workers: usize,
    },
}

impl RunProfile {
    pub fn parallel() -> Self {
        Self::Parallel {
            workers: DEFAULT_WORKERS,
        }
    }

    pub fn regression() -> Self {
        Self::Regression {
            workers: DEFAULT_WORKERS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Parallel { .. } => "parallel",
            Self::Smoke => "smoke",
            Self::Regression { .. } => "regression",
            Self::Custom { .. } => "custom",
        }
    }

    pub fn tag_expression(&self) -> Result<TagExpression, InvalidTagExpressionError> {
        match self {
            Self::All => Ok(TagExpression::empty()),
            Self::Parallel { .. } => TagExpression::excluding(IGNORE_TAG),
            Self::Smoke => TagExpression::requiring(SMOKE_TAG),
            Self::Regression { .. } => TagExpression::requiring(REGRESSION_TAG),
            Self::Custom { expression, .. } => Ok(expression.clone()),
        }
    }

    pub fn workers(&self) -> usize {
        match self {
            Self::All | Self::Smoke => 1,
            Self::Parallel { workers }
            | Self::Regression { workers }
            | Self::Custom { workers, .. } => *workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_expressions() {
        assert!(RunProfile::All.tag_expression().unwrap().is_empty());
        assert_eq!(
            RunProfile::parallel().tag_expression().unwrap().to_string(),
            "~@ignore"
        );
        assert_eq!(RunProfile::Smoke.tag_expression().unwrap().to_string(), "@smoke");
        assert_eq!(
            RunProfile::regression().tag_expression().unwrap().to_string(),
            "@regression"
        );
    }

    #[test]
    fn test_profile_workers() {
        assert_eq!(RunProfile::All.workers(), 1);
        assert_eq!(RunProfile::Smoke.workers(), 1);
        assert_eq!(RunProfile::parallel().workers(), 5);
        assert_eq!(RunProfile::Regression { workers: 8 }.workers(), 8);
    }

    #[test]
    fn test_custom_profile_keeps_expression() {
        let expression = TagExpression::parse("@users ~@slow").unwrap();
        let profile = RunProfile::Custom {
            expression: expression.clone(),
            workers: 2,
        };
        assert_eq!(profile.name(), "custom");
        assert_eq!(profile.tag_expression().unwrap(), expression);
        assert_eq!(profile.workers(), 2);
    }
}
