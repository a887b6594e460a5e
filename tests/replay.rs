//! Replays every scenario under tests/scenarios through the library and the
//! `threadview` binary

use std::path::{Path, PathBuf};
use std::process::Command;

use threadview::common::config::ViewConfig;
use threadview::replay;

fn scenarios_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("scenarios")
}

fn scenario_files() -> Vec<PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(scenarios_dir())
        .expect("Failed to read scenarios dir")
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "yaml"))
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn test_all_scenarios_pass() {
    let files = scenario_files();
    assert!(!files.is_empty(), "No scenarios found");

    for path in files {
        let result = replay::run_scenario(&path, &ViewConfig::default(), false)
            .await
            .expect("Scenario failed to load");
        assert!(
            result.passed,
            "{} failed at step {}/{}: {:?}",
            result.name, result.steps_run, result.steps_total, result.error
        );
        assert!(result.view_updates > 0, "{} posted no view updates", result.name);
    }
}

#[tokio::test]
async fn test_disconnect_leaves_empty_snapshot() {
    let result = replay::run_scenario(
        &scenarios_dir().join("session_lifecycle.yaml"),
        &ViewConfig::default(),
        false,
    )
    .await
    .unwrap();
    assert!(result.passed);
    assert!(result.snapshot.session.is_none());
    assert!(result.snapshot.tracked.is_empty());
}

#[test]
fn test_cli_replay() {
    let output = Command::new(env!("CARGO_BIN_EXE_threadview"))
        .arg("replay")
        .arg(scenarios_dir().join("hits_banner.yaml"))
        .arg("--json")
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to run threadview");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "replay failed:\n{stdout}");
    assert!(stdout.contains("Scenario Passed"));
    assert!(stdout.contains("\"history\""));
}

#[test]
fn test_cli_reports_failing_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(
        &path,
        r#"
name: broken
steps:
  - action: bind
  - action: expect
    bound: false
"#,
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_threadview"))
        .arg("replay")
        .arg(&path)
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to run threadview");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!output.status.success());
    assert!(stdout.contains("Failed scenarios:"));
    assert!(stdout.contains("broken"));
}
