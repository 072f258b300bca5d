//! featrun core library
//!
//! Discovers declarative API test specs, selects scenarios by tag and runs
//! them across a bounded worker pool. The `featrun` binary is a thin layer
//! over [`SuiteRunner`].

pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod executor;
pub mod filter;
pub mod gate;
pub mod gherkin;
pub mod loader;
pub mod obs;
pub mod process;
pub mod profile;
pub mod report;
pub mod suite;
pub mod telemetry;

pub use config::{RunnerConfig, CONFIG_FILE_NAME, DEFAULT_WORKERS};
pub use coordinator::{CancelHandle, CoordinatorConfig, ExecutionCoordinator, SelectedSpec};
pub use domain::{
    ExecutionLogEntry, RunResult, RunResultBuilder, Scenario, ScenarioId, ScenarioKind,
    ScenarioResult, ScenarioStatus, Spec, Step, Tag, TagExpression,
};
pub use error::{
    ConfigError, DiscoveryError, ExecutorError, FeatrunError, InvalidTagExpressionError, Result,
    ScenarioError,
};
pub use executor::{DeclaredTags, DryRunExecutor, ScenarioExecutor, ScenarioOutcome, TagSource};
pub use filter::TagFilter;
pub use gate::{GateVerdict, RunGate};
pub use loader::{SpecLoader, SpecStream};
pub use process::ProcessExecutor;
pub use profile::RunProfile;
pub use report::{render_summary, write_report_json, RunReport, RunReportArtifact};
pub use suite::{RunPlan, SuiteRunner};
pub use telemetry::init_tracing;
