//! Bounded worker pool that executes selected scenarios.
//!
//! Workers pull scenarios from a shared queue in submission order and run
//! them one at a time. Each collaborator call runs in its own task, so a
//! panic is caught and recorded as an execution error without taking the
//! worker down. Results flow through a channel to a single writer (the
//! coordinator) and the aggregate is only returned after every worker has
//! joined.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch, Mutex};
use tracing::{error, instrument, warn};

use crate::domain::{
    ExecutionLogEntry, RunResult, RunResultBuilder, Scenario, ScenarioResult, ScenarioStatus,
};
use crate::error::{ConfigError, ScenarioError};
use crate::executor::{ScenarioExecutor, ScenarioOutcome};
use crate::obs;

/// Pool size and per-scenario time budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    workers: usize,
    scenario_timeout: Option<Duration>,
}

impl CoordinatorConfig {
    /// `workers` must be at least 1.
    pub fn new(workers: usize) -> Result<Self, ConfigError> {
        if workers == 0 {
            return Err(ConfigError::Invalid(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            workers,
            scenario_timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.scenario_timeout = timeout;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn scenario_timeout(&self) -> Option<Duration> {
        self.scenario_timeout
    }
}

/// Cancellation signal shared between the caller and the coordinator.
///
/// Once cancelled, no further scenarios are dispatched; in-flight scenarios
/// run to completion.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Matched scenarios of one spec, in declaration order.
#[derive(Debug, Clone)]
pub struct SelectedSpec {
    pub spec: PathBuf,
    pub scenarios: Vec<Scenario>,
}

struct Finished {
    result: ScenarioResult,
    entry: ExecutionLogEntry,
}

/// Executes scenarios across a fixed-size worker pool.
pub struct ExecutionCoordinator {
    executor: Arc<dyn ScenarioExecutor>,
    config: CoordinatorConfig,
}

impl ExecutionCoordinator {
    pub fn new(executor: Arc<dyn ScenarioExecutor>, config: CoordinatorConfig) -> Self {
        Self { executor, config }
    }

    /// Run every scenario in `plan` and return the aggregated result.
    ///
    /// Scenario failures, collaborator errors, panics and timeouts are
    /// recorded per scenario. Scenarios still queued when `cancel` fires are
    /// recorded as skipped.
    #[instrument(skip_all, fields(workers = self.config.workers, executor = self.executor.name()))]
    pub async fn run(&self, plan: Vec<SelectedSpec>, cancel: &CancelHandle) -> RunResult {
        let mut seen = HashSet::new();
        let mut submitted = Vec::new();
        for selected in plan {
            for scenario in selected.scenarios {
                if !seen.insert(scenario.id.clone()) {
                    warn!(scenario = %scenario.id, "Dropping duplicate scenario submission");
                    continue;
                }
                submitted.push(scenario);
            }
        }

        let queue = Arc::new(Mutex::new(submitted.iter().cloned().collect::<VecDeque<_>>()));
        let (tx, mut rx) = mpsc::unbounded_channel::<Finished>();

        let mut workers = Vec::with_capacity(self.config.workers);
        for worker in 0..self.config.workers {
            workers.push(tokio::spawn(worker_loop(
                worker,
                Arc::clone(&queue),
                Arc::clone(&self.executor),
                self.config.scenario_timeout,
                cancel.clone(),
                tx.clone(),
            )));
        }
        drop(tx);

        // Single writer: only this task touches the aggregate.
        let mut builder = RunResultBuilder::new();
        while let Some(finished) = rx.recv().await {
            builder.log(finished.entry);
            let id = finished.result.id.clone();
            if !builder.record(finished.result) {
                warn!(scenario = %id, "Ignoring second result for scenario");
            }
        }

        for (worker, handle) in workers.into_iter().enumerate() {
            if let Err(e) = handle.await {
                error!(worker = worker, error = %e, "Worker terminated unexpectedly");
            }
        }

        let pending: Vec<Scenario> = queue.lock().await.drain(..).collect();
        if cancel.is_cancelled() {
            builder.mark_cancelled();
            obs::emit_run_cancelled(pending.len());
        }
        for scenario in pending {
            builder.record(ScenarioResult::skipped(scenario.id, scenario.name));
        }

        // Anything dispatched but never reported belonged to a worker that died.
        for scenario in submitted {
            if !builder.contains(&scenario.id) {
                builder.record(ScenarioResult::new(
                    scenario.id,
                    scenario.name,
                    ScenarioStatus::Errored {
                        error: ScenarioError::Execution {
                            detail: "worker terminated before reporting a result".to_string(),
                        },
                    },
                    0,
                ));
            }
        }

        builder.finish()
    }
}

async fn worker_loop(
    worker: usize,
    queue: Arc<Mutex<VecDeque<Scenario>>>,
    executor: Arc<dyn ScenarioExecutor>,
    timeout: Option<Duration>,
    cancel: CancelHandle,
    tx: mpsc::UnboundedSender<Finished>,
) {
    let mut seq = 0u64;
    loop {
        let scenario = {
            let mut queue = queue.lock().await;
            if cancel.is_cancelled() {
                break;
            }
            match queue.pop_front() {
                Some(scenario) => scenario,
                None => break,
            }
        };

        obs::emit_scenario_dispatched(worker, &scenario.id);
        let started = Instant::now();
        let status = execute_isolated(&executor, scenario.clone(), timeout).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        obs::emit_scenario_finished(worker, &scenario.id, &status, duration_ms);

        let entry = ExecutionLogEntry {
            worker,
            seq,
            scenario: scenario.id.clone(),
        };
        seq += 1;
        let result = ScenarioResult::new(scenario.id, scenario.name, status, duration_ms);
        if tx.send(Finished { result, entry }).is_err() {
            break;
        }
    }
}

async fn execute_isolated(
    executor: &Arc<dyn ScenarioExecutor>,
    scenario: Scenario,
    timeout: Option<Duration>,
) -> ScenarioStatus {
    let executor = Arc::clone(executor);
    let mut handle = tokio::spawn(async move { executor.execute(&scenario).await });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                return ScenarioStatus::Errored {
                    error: ScenarioError::Timeout {
                        limit_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    },
                };
            }
        },
        None => handle.await,
    };

    match joined {
        Ok(Ok(ScenarioOutcome::Passed)) => ScenarioStatus::Passed,
        Ok(Ok(ScenarioOutcome::Failed { detail })) => ScenarioStatus::Failed { detail },
        Ok(Err(e)) => ScenarioStatus::Errored {
            error: ScenarioError::Execution {
                detail: e.to_string(),
            },
        },
        Err(e) if e.is_panic() => ScenarioStatus::Errored {
            error: ScenarioError::Execution {
                detail: format!("worker crashed: {}", panic_message(e.into_panic())),
            },
        },
        Err(e) => ScenarioStatus::Errored {
            error: ScenarioError::Execution {
                detail: format!("worker terminated: {}", e),
            },
        },
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
