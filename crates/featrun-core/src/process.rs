//! Process-backed collaborator: runs one external command per scenario.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::config::RunnerConfig;
use crate::domain::Scenario;
use crate::error::{ConfigError, ExecutorError};
use crate::executor::{ScenarioExecutor, ScenarioOutcome};

/// Lines of captured output kept in a failure detail.
const DETAIL_TAIL_LINES: usize = 20;

/// Runs a configured command for each scenario.
///
/// Arguments may contain `{feature}`, `{line}` and `{name}` placeholders.
/// Scenario identity is also exported as `FEATRUN_*` environment variables.
/// Exit status 0 is a pass; anything else is a failure carrying the tail of
/// stderr (or stdout when stderr is empty). The child is killed if the call
/// is dropped, e.g. on timeout. On unix it runs in its own process group.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl ProcessExecutor {
    /// Build from a command line: program followed by arguments.
    pub fn new(command: Vec<String>) -> Result<Self, ConfigError> {
        let mut parts = command.into_iter();
        let program = parts
            .next()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ConfigError::Invalid("executor command is empty".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
            env: Vec::new(),
        })
    }

    /// Build from configuration, exporting environment and HTTP settings.
    pub fn from_config(config: &RunnerConfig) -> Result<Self, ConfigError> {
        let mut executor = Self::new(config.executor.command.clone())?
            .with_env("FEATRUN_ENV", &config.env)
            .with_env(
                "FEATRUN_CONNECT_TIMEOUT_MS",
                config.http.connect_timeout_ms.to_string(),
            )
            .with_env("FEATRUN_READ_TIMEOUT_MS", config.http.read_timeout_ms.to_string())
            .with_env("FEATRUN_RETRY_COUNT", config.http.retry_count.to_string())
            .with_env(
                "FEATRUN_RETRY_INTERVAL_MS",
                config.http.retry_interval_ms.to_string(),
            );
        if let Some(base_url) = config.base_url() {
            executor = executor.with_env("FEATRUN_BASE_URL", base_url);
        }
        Ok(executor)
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn render_args(&self, scenario: &Scenario) -> Vec<String> {
        let feature = scenario.id.spec.display().to_string();
        let line = scenario.line().to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{feature}", &feature)
                    .replace("{line}", &line)
                    .replace("{name}", &scenario.name)
            })
            .collect()
    }
}

#[async_trait]
impl ScenarioExecutor for ProcessExecutor {
    async fn execute(&self, scenario: &Scenario) -> Result<ScenarioOutcome, ExecutorError> {
        let args = self.render_args(scenario);
        let tags: Vec<String> = scenario.tags.iter().map(|t| t.to_string()).collect();

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .env("FEATRUN_FEATURE", scenario.id.spec.as_os_str())
            .env("FEATRUN_LINE", scenario.line().to_string())
            .env("FEATRUN_SCENARIO", &scenario.name)
            .env("FEATRUN_TAGS", tags.join(","))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a terminal Ctrl-C reaches featrun only and
        // in-flight scenarios can finish.
        #[cfg(unix)]
        command.process_group(0);

        debug!(program = %self.program, args = ?args, scenario = %scenario.id, "Spawning executor");
        let child = command.spawn().map_err(|source| ExecutorError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        let output = child.wait_with_output().await?;

        if output.status.success() {
            return Ok(ScenarioOutcome::Passed);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let captured = if stderr.trim().is_empty() { stdout } else { stderr };
        let status = match output.status.code() {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        let tail = tail_lines(&captured, DETAIL_TAIL_LINES);
        let detail = if tail.is_empty() {
            status
        } else {
            format!("{}: {}", status, tail)
        };
        Ok(ScenarioOutcome::Failed { detail })
    }

    fn name(&self) -> &str {
        &self.program
    }
}

fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n").trim().to_string()
}
