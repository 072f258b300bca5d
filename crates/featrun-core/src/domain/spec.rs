//! Specs (feature files) and the scenarios they declare.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use super::tag::Tag;

/// Stable identity of a scenario within a run: the spec path plus the line
/// of its `Scenario:` header.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScenarioId {
    pub spec: PathBuf,
    pub line: usize,
}

impl ScenarioId {
    pub fn new(spec: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            spec: spec.into(),
            line,
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.spec.display(), self.line)
    }
}

/// A single declarative step. The runner never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// `Given`, `When`, `Then`, `And`, `But` or `*`.
    pub keyword: String,
    pub text: String,
    pub line: usize,
    /// Doc string or table rows attached to the step, verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachment: Vec<String>,
}

/// Whether a scenario is a plain scenario or an outline expanded by examples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ScenarioKind {
    Scenario,
    /// Outline with the total number of example rows across its `Examples:` blocks.
    Outline { examples: usize },
}

/// A named, tagged sequence of steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: ScenarioId,
    pub name: String,
    pub kind: ScenarioKind,
    /// Effective tags: feature tags, scenario tags and example-block tags.
    pub tags: BTreeSet<Tag>,
    /// Background steps of the owning spec, run before `steps`.
    pub background: Vec<Step>,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    /// Source line of the scenario header.
    pub fn line(&self) -> usize {
        self.id.line
    }
}

/// A parsed feature file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spec {
    /// File path; unique within a run.
    pub path: PathBuf,
    pub feature: String,
    pub tags: BTreeSet<Tag>,
    pub background: Vec<Step>,
    pub scenarios: Vec<Scenario>,
}

impl Spec {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn scenario_count(&self) -> usize {
        self.scenarios.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_id_display_is_path_and_line() {
        let id = ScenarioId::new("features/users.feature", 12);
        assert_eq!(id.to_string(), "features/users.feature:12");
    }

    #[test]
    fn test_scenario_ids_order_by_path_then_line() {
        let a = ScenarioId::new("a.feature", 30);
        let b = ScenarioId::new("a.feature", 4);
        let c = ScenarioId::new("b.feature", 1);
        let mut ids = vec![c.clone(), a.clone(), b.clone()];
        ids.sort();
        assert_eq!(ids, vec![b, a, c]);
    }

    #[test]
    fn test_scenario_kind_serializes_with_tag() {
        let json = serde_json::to_value(ScenarioKind::Outline { examples: 3 }).unwrap();
        assert_eq!(json["kind"], "outline");
        assert_eq!(json["examples"], 3);
    }
}
