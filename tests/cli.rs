// tests/cli.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const DEPENDENCIES: &str = r#"
name: has_marker
spec:
  requirements:
  - has_bash
  test:
  - name: marker_exists
    type: shell
    spec: test -f marker
  install:
  - name: create_marker
    type: shell
    spec: touch marker
---
name: has_bash
spec:
  test:
  - name: bash_version
    type: shell
    spec: bash --version
"#;

/// A project directory with its own, empty, WDM home.
fn project(dependencies: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("home")).unwrap();
    fs::write(dir.path().join("dependencies.yaml"), dependencies).unwrap();
    dir
}

fn wdm(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("wdm").unwrap();
    cmd.current_dir(dir.path())
        .env("WDM_HOME", dir.path().join("home"))
        .env("LOGLEVEL", "info")
        .env("NO_COLOR", "1")
        .env_remove("WDM_TARGET")
        .env_remove("WDM_DEPENDENCY_FILE")
        .env_remove("WDM_CONFIG")
        .env_remove("WDM_CONFIG_FILE")
        .env_remove("WDM_LIBRARY");
    cmd
}

#[test]
fn test_list_prints_every_dependency() {
    let dir = project(DEPENDENCIES);
    wdm(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout("- has_marker\n- has_bash\n");
}

#[test]
fn test_list_includes_library_dependencies() {
    let dir = project(DEPENDENCIES);
    fs::create_dir(dir.path().join("home/library.d")).unwrap();
    fs::write(
        dir.path().join("home/library.d/gpu.yaml"),
        "name: has_gpu\nspec:\n  test: [{name: lspci, type: shell, spec: lspci}]\n",
    )
    .unwrap();

    wdm(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("- library.gpu.has_gpu"));
}

#[test]
fn test_test_mode_reports_failures() {
    let dir = project(DEPENDENCIES);
    wdm(&dir)
        .arg("test")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Would have installed:"))
        .stderr(predicate::str::contains("has_marker.create_marker"));
    assert!(!dir.path().join("marker").exists());
}

#[test]
fn test_ensure_installs_then_passes() {
    let dir = project(DEPENDENCIES);
    wdm(&dir)
        .arg("ensure")
        .assert()
        .success()
        .stderr(predicate::str::contains("has_marker.marker_exists (failed, fixed by install)"));
    assert!(dir.path().join("marker").exists());

    // Already satisfied: nothing left to install.
    wdm(&dir)
        .arg("ensure")
        .assert()
        .success()
        .stderr(predicate::str::contains("Installed: nothing."));
}

#[test]
fn test_dryrun_executes_nothing() {
    let dir = project(DEPENDENCIES);
    wdm(&dir)
        .args(["dryrun", "has_marker"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Would have tested:"));
    assert!(!dir.path().join("marker").exists());
}

#[test]
fn test_unknown_target_is_a_usage_error() {
    let dir = project(DEPENDENCIES);
    wdm(&dir)
        .args(["test", "has_nothing"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Main dependency 'has_nothing' does not exist."));
}

#[test]
fn test_invalid_dependency_file_is_a_usage_error() {
    let dir = project("name: broken\nspec:\n  test:\n  - name: t\n    type: make\n    spec: all\n");
    wdm(&dir)
        .arg("test")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown task type"));
}

#[test]
fn test_missing_dependency_file() {
    let dir = TempDir::new().unwrap();
    wdm(&dir)
        .args(["test", "--dependency-file", "nowhere.yaml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("dependency-file='nowhere.yaml'"));
}

#[test]
fn test_missing_requirement_fails_the_run() {
    let dir = project("name: has_app\nspec:\n  requirements: [has_database]\n");
    wdm(&dir)
        .arg("ensure")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Missing required dependency: has_database"));
}

#[test]
fn test_configuration_from_cli_and_config_file() {
    let dir = project(
        r#"
name: has_namespace
spec:
  configuration: [namespace, replicas]
  test:
  - name: values
    type: shell
    spec: '[ "$namespace" = gpu ] && [ "$replicas" = 3 ]'
"#,
    );
    fs::write(dir.path().join(".wdm_config"), "namespace=from-file\nreplicas=3\n").unwrap();

    wdm(&dir)
        .args(["test", "--config", "namespace=gpu"])
        .assert()
        .success();

    wdm(&dir)
        .args(["test", "--config-file", "no", "--config", "namespace=gpu"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("replicas"));
}

#[test]
fn test_flags_fall_back_to_environment_variables() {
    let dir = project(DEPENDENCIES);
    fs::write(
        dir.path().join("other.yaml"),
        r#"
name: has_namespace
spec:
  configuration: [namespace]
  test:
  - name: value
    type: shell
    spec: '[ "$namespace" = gpu ]'
"#,
    )
    .unwrap();

    wdm(&dir)
        .arg("test")
        .env("WDM_DEPENDENCY_FILE", "other.yaml")
        .env("WDM_CONFIG", "namespace=gpu")
        .assert()
        .success()
        .stderr(predicate::str::contains("has_namespace.value"));
}

#[test]
fn test_positional_target_wins_over_environment() {
    let dir = project(DEPENDENCIES);
    wdm(&dir)
        .args(["test", "has_bash"])
        .env("WDM_TARGET", "has_marker")
        .assert()
        .success()
        .stderr(predicate::str::contains("has_marker").not());
}

#[test]
fn test_env_file_supplies_the_target() {
    let dir = project(DEPENDENCIES);
    fs::write(dir.path().join(".wdm_env"), "WDM_TARGET=has_bash\n").unwrap();

    // Without the env file, the first entry (has_marker) would fail its test.
    wdm(&dir)
        .arg("test")
        .assert()
        .success()
        .stderr(predicate::str::contains("has_bash.bash_version"));
}

#[test]
fn test_environment_wins_over_env_file() {
    let dir = project(DEPENDENCIES);
    fs::write(dir.path().join(".wdm_env"), "WDM_TARGET=has_marker\n").unwrap();

    wdm(&dir)
        .arg("test")
        .env("WDM_TARGET", "has_bash")
        .assert()
        .success()
        .stderr(predicate::str::contains("has_marker").not());
}

#[test]
fn test_example_prints_a_dependency_file() {
    let dir = TempDir::new().unwrap();
    wdm(&dir)
        .arg("example")
        .assert()
        .success()
        .stdout(predicate::str::contains("name: has_gpu_operator"))
        .stdout(predicate::str::contains("- has_nfd"));
}
