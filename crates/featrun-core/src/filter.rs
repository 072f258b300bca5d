//! Tag-based scenario selection.

use crate::domain::{Scenario, Spec, TagExpression};
use crate::executor::TagSource;

/// Selects scenarios whose effective tags satisfy a [`TagExpression`].
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    expression: TagExpression,
}

impl TagFilter {
    pub fn new(expression: TagExpression) -> Self {
        Self { expression }
    }

    pub fn matches(&self, scenario: &Scenario) -> bool {
        self.expression.matches(&scenario.tags)
    }

    /// Matching scenarios of a spec, in declaration order.
    pub fn select<'a>(&self, spec: &'a Spec) -> Vec<&'a Scenario> {
        spec.scenarios.iter().filter(|s| self.matches(s)).collect()
    }

    /// Like [`select`](Self::select), but first asks `tags` for the spec's
    /// combined tag set and skips the scan when no required tag is present.
    pub fn select_with<'a>(&self, spec: &'a Spec, tags: &dyn TagSource) -> Vec<&'a Scenario> {
        if !self.expression.required().is_empty()
            && !self.expression.could_match(&tags.discover_tags(spec))
        {
            return Vec::new();
        }
        self.select(spec)
    }
}
