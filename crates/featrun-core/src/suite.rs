//! Suite driver: discover, select, execute, gate.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::coordinator::{CancelHandle, CoordinatorConfig, ExecutionCoordinator, SelectedSpec};
use crate::domain::{ScenarioId, TagExpression};
use crate::error::Result;
use crate::executor::{DeclaredTags, ScenarioExecutor, TagSource};
use crate::filter::TagFilter;
use crate::gate::RunGate;
use crate::loader::SpecLoader;
use crate::obs;
use crate::profile::RunProfile;
use crate::report::RunReport;

/// Scenarios selected for one run.
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Specs with at least one selected scenario, in discovery order.
    pub specs: Vec<SelectedSpec>,
    /// Number of spec files discovered, matched or not.
    pub specs_scanned: usize,
    /// SHA-256 over the ordered scenario identifiers.
    pub digest: String,
}

impl RunPlan {
    pub fn scenario_count(&self) -> usize {
        self.specs.iter().map(|s| s.scenarios.len()).sum()
    }

    pub fn scenario_ids(&self) -> impl Iterator<Item = &ScenarioId> {
        self.specs
            .iter()
            .flat_map(|s| s.scenarios.iter().map(|scenario| &scenario.id))
    }
}

/// Runs a profile against every spec under a root directory.
pub struct SuiteRunner {
    loader: SpecLoader,
    root: PathBuf,
    tags: Arc<dyn TagSource>,
    executor: Arc<dyn ScenarioExecutor>,
    scenario_timeout: Option<Duration>,
}

impl SuiteRunner {
    pub fn new(
        loader: SpecLoader,
        root: impl Into<PathBuf>,
        executor: Arc<dyn ScenarioExecutor>,
    ) -> Self {
        Self {
            loader,
            root: root.into(),
            tags: Arc::new(DeclaredTags),
            executor,
            scenario_timeout: None,
        }
    }

    pub fn with_tag_source(mut self, tags: Arc<dyn TagSource>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.scenario_timeout = timeout;
        self
    }

    /// Load every spec and select matching scenarios.
    ///
    /// Any discovery, read or parse error aborts planning.
    pub fn plan(&self, expression: &TagExpression) -> Result<RunPlan> {
        let filter = TagFilter::new(expression.clone());
        let mut specs = Vec::new();
        let mut specs_scanned = 0;

        for spec in self.loader.discover(&self.root)? {
            let spec = spec?;
            specs_scanned += 1;
            let scenarios: Vec<_> = filter
                .select_with(&spec, self.tags.as_ref())
                .into_iter()
                .cloned()
                .collect();
            if scenarios.is_empty() {
                continue;
            }
            specs.push(SelectedSpec {
                spec: spec.path,
                scenarios,
            });
        }

        let mut plan = RunPlan {
            specs,
            specs_scanned,
            digest: String::new(),
        };
        plan.digest = plan_digest(plan.scenario_ids());
        Ok(plan)
    }

    /// Plan and execute `profile`.
    ///
    /// Fatal errors are returned before any scenario executes. Scenario
    /// failures end up in the report.
    pub async fn run(&self, profile: &RunProfile, cancel: &CancelHandle) -> Result<RunReport> {
        let expression = profile.tag_expression()?;
        let config = CoordinatorConfig::new(profile.workers())?.with_timeout(self.scenario_timeout);
        let run_id = Uuid::new_v4().to_string();
        let span = obs::run_span(&run_id, profile.name());
        self.execute(profile, expression, config, run_id, cancel)
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        profile: &RunProfile,
        expression: TagExpression,
        config: CoordinatorConfig,
        run_id: String,
        cancel: &CancelHandle,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        let started = Instant::now();
        let tags = expression.to_string();
        obs::emit_run_started(&run_id, profile.name(), config.workers(), &tags);

        let plan = self.plan(&expression)?;
        obs::emit_run_planned(&run_id, plan.specs.len(), plan.scenario_count(), &plan.digest);
        if plan.scenario_count() == 0 {
            info!(root = %self.root.display(), "No scenarios matched");
        }

        let coordinator = ExecutionCoordinator::new(Arc::clone(&self.executor), config);
        let result = coordinator.run(plan.specs, cancel).await;
        let verdict = RunGate::evaluate(&result);
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        obs::emit_run_finished(
            &run_id,
            duration_ms,
            result.passed_count(),
            result.failed_count(),
            result.skipped_count(),
        );

        Ok(RunReport {
            run_id,
            profile: profile.name().to_string(),
            tags,
            workers: config.workers(),
            plan_digest: plan.digest,
            specs_scanned: plan.specs_scanned,
            started_at,
            duration_ms,
            result,
            verdict,
        })
    }
}

/// Digest over scenario identifiers in plan order.
fn plan_digest<'a>(ids: impl Iterator<Item = &'a ScenarioId>) -> String {
    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.to_string().as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}
