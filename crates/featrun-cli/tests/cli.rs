//! Exit codes and output of the `featrun` binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::TempDir;

const USERS: &str = "\
Feature: users

  @smoke
  Scenario: health check
    * method get

  @regression
  Scenario: list users
    * method get

  @ignore
  Scenario: flaky export
    * method get
";

fn workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("features")).unwrap();
    fs::write(tmp.path().join("features/users.feature"), USERS).unwrap();
    tmp
}

fn featrun(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("featrun").unwrap();
    cmd.current_dir(dir)
        .env_remove("FEATRUN_ENV")
        .env_remove("RUST_LOG")
        .args(["--features", "features"]);
    cmd
}

#[test]
fn missing_feature_directory_exits_2() {
    let tmp = TempDir::new().unwrap();
    featrun(tmp.path())
        .args(["run-all", "--dry-run"])
        .assert()
        .code(2)
        .stderr(contains("spec root does not exist"));
}

#[test]
fn dry_run_smoke_passes() {
    let tmp = workspace();
    featrun(tmp.path())
        .args(["run-smoke", "--dry-run"])
        .assert()
        .code(0)
        .stdout(contains("1 total, 1 passed, 0 failed, 0 skipped"))
        .stdout(contains("PASSED"));
}

#[test]
fn dry_run_parallel_excludes_ignored() {
    let tmp = workspace();
    featrun(tmp.path())
        .args(["run-parallel", "--workers", "3", "--dry-run"])
        .assert()
        .code(0)
        .stdout(contains("parallel, 3 worker(s), tags ~@ignore"))
        .stdout(contains("2 total, 2 passed"));
}

#[test]
fn invalid_tag_expression_exits_2() {
    let tmp = workspace();
    featrun(tmp.path())
        .args(["run", "--tags", "smoke", "--dry-run"])
        .assert()
        .code(2)
        .stderr(contains("invalid tag expression"));
}

#[test]
fn zero_workers_exits_2() {
    let tmp = workspace();
    featrun(tmp.path())
        .args(["run-regression", "--workers", "0", "--dry-run"])
        .assert()
        .code(2)
        .stderr(contains("worker count must be at least 1"));
}

#[test]
fn missing_executor_command_exits_2() {
    let tmp = workspace();
    featrun(tmp.path())
        .arg("run-smoke")
        .assert()
        .code(2)
        .stderr(contains("no executor command configured"));
}

#[test]
fn list_prints_selected_scenarios() {
    let tmp = workspace();
    featrun(tmp.path())
        .args(["list", "--tags", "~@ignore"])
        .assert()
        .code(0)
        .stdout(contains("health check  [@smoke]"))
        .stdout(contains("list users  [@regression]"))
        .stdout(contains("flaky export").not())
        .stdout(contains("2 scenario(s) in 1 of 1 spec(s)"));
}

#[test]
fn report_file_is_written() {
    let tmp = workspace();
    featrun(tmp.path())
        .args(["run-all", "--dry-run", "--report", "report.json"])
        .assert()
        .code(0);

    let report = fs::read_to_string(tmp.path().join("report.json")).unwrap();
    assert!(report.contains("\"schema_version\": \"1.0\""));
    assert!(report.contains("\"profile\": \"all\""));
}

#[cfg(unix)]
#[test]
fn failing_executor_exits_1() {
    let tmp = workspace();
    featrun(tmp.path())
        .args(["run-regression", "--exec", "false"])
        .assert()
        .code(1)
        .stdout(contains("list users [failed]: exit code 1"))
        .stdout(contains("FAILED"));
}

#[cfg(unix)]
#[test]
fn passing_executor_exits_0() {
    let tmp = workspace();
    featrun(tmp.path())
        .args(["run-smoke", "--exec", "true"])
        .assert()
        .code(0);
}

#[cfg(unix)]
#[test]
fn config_file_environment_reaches_executor() {
    let tmp = workspace();
    fs::write(
        tmp.path().join("featrun.toml"),
        r#"
env = "qa"

[environments.dev]
base_url = "http://localhost:8080"

[environments.qa]
base_url = "http://qa.internal"

[executor]
command = ["sh", "-c", "test \"$FEATRUN_BASE_URL\" = http://qa.internal && test \"$FEATRUN_ENV\" = qa"]
"#,
    )
    .unwrap();

    featrun(tmp.path()).arg("run-smoke").assert().code(0);

    featrun(tmp.path())
        .args(["run-smoke", "--env", "dev"])
        .assert()
        .code(1);

    featrun(tmp.path())
        .args(["run-smoke", "--env", "staging"])
        .assert()
        .code(2)
        .stderr(contains("unknown environment").or(contains("staging")));
}

#[cfg(unix)]
mod interrupt {
    use super::*;
    use std::os::unix::process::CommandExt;
    use std::process::{Child, Output, Stdio};
    use std::time::{Duration, Instant};

    const THREE: &str = "\
Feature: slow

  Scenario: one
    * get /one

  Scenario: two
    * get /two

  Scenario: three
    * get /three
";

    /// Start `featrun run-all` as the leader of a fresh process group,
    /// the way a terminal starts a foreground job.
    fn spawn_run_all(dir: &Path, script: &str) -> Child {
        fs::create_dir_all(dir.join("features")).unwrap();
        fs::write(dir.join("features/slow.feature"), THREE).unwrap();
        fs::write(
            dir.join("featrun.toml"),
            format!("[executor]\ncommand = [\"sh\", \"-c\", \"{}\"]\n", script),
        )
        .unwrap();
        std::process::Command::new(assert_cmd::cargo::cargo_bin("featrun"))
            .current_dir(dir)
            .env_remove("FEATRUN_ENV")
            .env_remove("RUST_LOG")
            .args(["--features", "features", "run-all"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .spawn()
            .unwrap()
    }

    fn wait_for(path: &Path) {
        let deadline = Instant::now() + Duration::from_secs(20);
        while !path.exists() {
            assert!(Instant::now() < deadline, "scenario never started");
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    /// Deliver SIGINT to the whole process group, as Ctrl-C does.
    fn interrupt_group(child: &Child) {
        let status = std::process::Command::new("sh")
            .arg("-c")
            .arg(format!("kill -INT -{}", child.id()))
            .status()
            .unwrap();
        assert!(status.success());
    }

    fn wait_output(mut child: Child) -> Output {
        let deadline = Instant::now() + Duration::from_secs(20);
        while child.try_wait().unwrap().is_none() {
            if Instant::now() > deadline {
                child.kill().ok();
                panic!("featrun did not exit");
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        child.wait_with_output().unwrap()
    }

    #[test]
    fn ctrl_c_lets_in_flight_scenario_finish() {
        let tmp = TempDir::new().unwrap();
        // Each scenario marks its start and then takes a second.
        let child = spawn_run_all(tmp.path(), "touch started; sleep 1");
        wait_for(&tmp.path().join("started"));
        interrupt_group(&child);

        let output = wait_output(child);
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(output.status.code(), Some(0), "stdout: {}", stdout);
        assert!(stdout.contains("3 total, 1 passed, 0 failed, 2 skipped"), "{}", stdout);
        assert!(stdout.contains("cancelled"), "{}", stdout);
    }

    #[test]
    fn second_ctrl_c_aborts_the_run() {
        let tmp = TempDir::new().unwrap();
        let child = spawn_run_all(tmp.path(), "touch started; exec sleep 60");
        wait_for(&tmp.path().join("started"));
        let started = Instant::now();
        interrupt_group(&child);
        std::thread::sleep(Duration::from_millis(300));
        interrupt_group(&child);

        let output = wait_output(child);
        assert!(started.elapsed() < Duration::from_secs(30));
        assert_eq!(output.status.code(), Some(2));
        assert!(String::from_utf8_lossy(&output.stderr).contains("aborted by a second interrupt"));
    }
}
