//! Domain model: specs, scenarios, tags and run results.

pub mod result;
pub mod spec;
pub mod tag;

pub use result::{ExecutionLogEntry, RunResult, RunResultBuilder, ScenarioResult, ScenarioStatus};
pub use spec::{Scenario, ScenarioId, ScenarioKind, Spec, Step};
pub use tag::{Tag, TagExpression};
