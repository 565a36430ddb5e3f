#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn neurocore(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("neurocore").unwrap();
    cmd.current_dir(dir.path())
        .env("NEUROCORE_ROOT", dir.path())
        .env_remove("RUST_LOG");
    cmd
}

/// Mock mode with no artificial delay.
fn fast_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".neurocore")).unwrap();
    std::fs::write(
        dir.path().join(".neurocore/config.yaml"),
        "execution:\n  mode: mock\n  mock_delay_ms: 0\nmetrics:\n  source: mock\n  seed: 7\n  interval_ms: 1\n",
    )
    .unwrap();
    dir
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

// ---------------------------------------------------------------------------
// actions
// ---------------------------------------------------------------------------

#[test]
fn actions_list_shows_catalog() {
    let dir = fast_project();
    neurocore(&dir)
        .args(["actions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("temp-cleanup"))
        .stdout(predicate::str::contains("Clean Temporary Files"));
}

#[test]
fn actions_list_filters_by_category() {
    let dir = fast_project();
    let json = stdout_json(neurocore(&dir).args(["actions", "list", "--category", "CPU", "--json"]));
    let ids: Vec<_> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["cpu-power-management", "core-parking", "frequency-scaling"]);
}

#[test]
fn actions_show_unknown_fails() {
    let dir = fast_project();
    neurocore(&dir)
        .args(["actions", "show", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown action: does-not-exist"));
}

// ---------------------------------------------------------------------------
// run / status
// ---------------------------------------------------------------------------

#[test]
fn run_single_action_succeeds() {
    let dir = fast_project();
    neurocore(&dir)
        .args(["run", "temp-cleanup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Temporary files cleaned"));
}

#[test]
fn run_several_actions_reports_each() {
    let dir = fast_project();
    let json = stdout_json(neurocore(&dir).args(["run", "registry", "trim-ssd", "--json"]));
    let results = json.as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r["success"] == true));
    assert_eq!(results[1]["id"], "trim-ssd");
}

#[test]
fn run_unknown_id_fails_before_running() {
    let dir = fast_project();
    neurocore(&dir)
        .args(["run", "temp-cleanup", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown action"))
        .stdout(predicate::str::contains("Temporary files cleaned").not());
}

#[test]
fn status_is_pending_in_fresh_process() {
    let dir = fast_project();
    let json = stdout_json(neurocore(&dir).args(["status", "restore-point", "--json"]));
    assert_eq!(json["id"], "restore-point");
    assert_eq!(json["status"], "pending");
}

#[test]
fn status_help_points_to_serve() {
    let dir = fast_project();
    neurocore(&dir)
        .args(["status", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("neurocore serve"))
        .stdout(predicate::str::contains("/api/status"));
}

// ---------------------------------------------------------------------------
// metrics
// ---------------------------------------------------------------------------

#[test]
fn metrics_mock_snapshot() {
    let dir = fast_project();
    let json = stdout_json(neurocore(&dir).args(["metrics", "--json"]));
    let usage = json["cpu"]["usage"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&usage));
}

#[test]
fn metrics_multiple_samples() {
    let dir = fast_project();
    let json = stdout_json(neurocore(&dir).args(["metrics", "--samples", "3", "--json"]));
    assert_eq!(json.as_array().unwrap().len(), 3);
}

#[test]
fn metrics_rejects_unknown_source() {
    let dir = fast_project();
    neurocore(&dir)
        .args(["metrics", "--source", "psychic"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// prefs / settings
// ---------------------------------------------------------------------------

#[test]
fn prefs_roundtrip_through_file() {
    let dir = fast_project();
    neurocore(&dir)
        .args(["prefs", "set", "language", "pt-BR"])
        .assert()
        .success();
    neurocore(&dir)
        .args(["prefs", "get", "language"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pt-BR"));
    neurocore(&dir)
        .args(["prefs", "has", "language"])
        .assert()
        .success()
        .stdout(predicate::str::contains("true"));
    neurocore(&dir)
        .args(["prefs", "delete", "language"])
        .assert()
        .success();
    neurocore(&dir)
        .args(["prefs", "get", "language"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not set"));
    assert!(dir.path().join(".neurocore/preferences.json").exists());
}

#[test]
fn settings_theme_persists() {
    let dir = fast_project();
    neurocore(&dir)
        .args(["settings", "theme", "neon"])
        .assert()
        .success();
    let json = stdout_json(neurocore(&dir).args(["settings", "show", "--json"]));
    assert_eq!(json["theme"], "neon");
    assert_eq!(json["sidebar_open"], true);
}

#[test]
fn settings_rejects_unknown_theme() {
    let dir = fast_project();
    neurocore(&dir)
        .args(["settings", "theme", "solarized"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_init_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    neurocore(&dir).args(["config", "init"]).assert().success();
    assert!(dir.path().join(".neurocore/config.yaml").exists());
    neurocore(&dir)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    neurocore(&dir)
        .args(["config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn config_validate_flags_bad_drive() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".neurocore")).unwrap();
    std::fs::write(
        dir.path().join(".neurocore/config.yaml"),
        "system:\n  drive: \"C: & del\"\n",
    )
    .unwrap();
    neurocore(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error] invalid drive letter"));
}

#[test]
fn config_show_prints_yaml() {
    let dir = fast_project();
    neurocore(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mock_delay_ms: 0"));
}
