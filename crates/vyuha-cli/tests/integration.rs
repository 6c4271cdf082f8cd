#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Offline invocation: no oracle credentials, so the rule-based proposer and
/// the fallback pass are in play.
fn vyuha(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("vyuha").unwrap();
    cmd.current_dir(dir.path())
        .env("VYUHA_ROOT", dir.path())
        .env_remove("GEMINI_API_KEY")
        .env_remove("WHITE_CIRCLE_API_KEY")
        .env_remove("WHITE_CIRCLE_DEPLOYMENT_ID")
        .env_remove("RUST_LOG");
    cmd
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn write_risk(dir: &TempDir, probability: f64) -> std::path::PathBuf {
    let path = dir.path().join("risk.json");
    let risk = serde_json::json!({
        "status": if probability > 0.7 { "CRITICAL" } else { "SAFE" },
        "collision_probability": probability,
        "distance_km": 1.2,
        "source_label": "celestrak",
        "scenario_mode": "LIVE",
    });
    std::fs::write(&path, serde_json::to_vec(&risk).unwrap()).unwrap();
    path
}

// ---------------------------------------------------------------------------
// vyuha init / config
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config() {
    let dir = TempDir::new().unwrap();
    vyuha(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: .vyuha/config.yaml"));
    assert!(dir.path().join(".vyuha/config.yaml").exists());
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    vyuha(&dir).arg("init").assert().success();
    vyuha(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:"));
}

#[test]
fn config_validate_passes_on_defaults() {
    let dir = TempDir::new().unwrap();
    vyuha(&dir).arg("init").assert().success();
    vyuha(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_rejects_zero_retries() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".vyuha")).unwrap();
    std::fs::write(
        dir.path().join(".vyuha/config.yaml"),
        "retry:\n  max_retries: 0\n",
    )
    .unwrap();
    vyuha(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn act_refuses_invalid_config() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".vyuha")).unwrap();
    std::fs::write(
        dir.path().join(".vyuha/config.yaml"),
        "retry:\n  max_retries: 0\n",
    )
    .unwrap();
    vyuha(&dir)
        .args(["act", "--simulate-danger"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("retry.max_retries must be at least 1"));
    assert!(!dir.path().join(".vyuha/events.jsonl").exists());
}

// ---------------------------------------------------------------------------
// vyuha scan / act
// ---------------------------------------------------------------------------

#[test]
fn scan_requires_a_risk_source() {
    let dir = TempDir::new().unwrap();
    vyuha(&dir)
        .arg("scan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--risk-file"));
}

#[test]
fn scan_simulated_danger_json() {
    let dir = TempDir::new().unwrap();
    let record = json_output(vyuha(&dir).args(["--json", "scan", "--simulate-danger"]));
    assert_eq!(record["risk"]["status"], "CRITICAL");
    assert_eq!(record["risk"]["scenario_mode"], "SYNTHETIC");
    assert_eq!(record["satellite_id"], "ISS");
}

#[test]
fn act_from_risk_file_executes() {
    let dir = TempDir::new().unwrap();
    let risk = write_risk(&dir, 0.95);
    let cycle = json_output(vyuha(&dir).args([
        "--json",
        "act",
        "--risk-file",
        risk.to_str().unwrap(),
        "--session",
        "cli-1",
    ]));
    assert_eq!(cycle["final_status"], "EXECUTED");
    assert_eq!(cycle["session_id"], "cli-1");
    assert_eq!(cycle["attempts"][0]["command"]["action"], "FIRE_THRUSTERS");
}

#[test]
fn act_with_injected_threat_shows_blocked_attempt() {
    let dir = TempDir::new().unwrap();
    vyuha(&dir)
        .args(["act", "--simulate-danger", "--inject-threat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("blocked"))
        .stdout(predicate::str::contains("TOWARD_DEBRIS"))
        .stdout(predicate::str::contains("EXECUTED"));
}

#[test]
fn act_with_invalid_risk_fails_without_events() {
    let dir = TempDir::new().unwrap();
    let risk = write_risk(&dir, 1.5);
    vyuha(&dir)
        .args(["act", "--risk-file", risk.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("collision_probability"));
    assert!(!dir.path().join(".vyuha/events.jsonl").exists());
}

// ---------------------------------------------------------------------------
// vyuha state / restore / history / insights
// ---------------------------------------------------------------------------

#[test]
fn state_restore_history_roundtrip() {
    let dir = TempDir::new().unwrap();

    let state = json_output(vyuha(&dir).args(["--json", "state"]));
    assert_eq!(state["on_baseline"], true);
    assert_eq!(state["maneuver_count"], 0);

    vyuha(&dir)
        .args(["act", "--simulate-danger"])
        .assert()
        .success();

    let state = json_output(vyuha(&dir).args(["--json", "state"]));
    assert_eq!(state["on_baseline"], false);

    let restored = json_output(vyuha(&dir).args(["--json", "restore"]));
    assert_eq!(restored["status"], "RESTORED");
    let again = json_output(vyuha(&dir).args(["--json", "restore"]));
    assert_eq!(again["status"], "ALREADY_ON_BASELINE");

    let history = json_output(vyuha(&dir).args(["--json", "history"]));
    assert_eq!(history["total_maneuvers"], 1);
}

#[test]
fn insights_on_empty_root() {
    let dir = TempDir::new().unwrap();
    vyuha(&dir)
        .arg("insights")
        .assert()
        .success()
        .stdout(predicate::str::contains("No runtime data yet"));
}

#[test]
fn insights_count_fallback_validations() {
    let dir = TempDir::new().unwrap();
    vyuha(&dir)
        .args(["scan", "--simulate-danger", "--latency-ms", "120"])
        .assert()
        .success();
    vyuha(&dir)
        .args(["act", "--simulate-danger"])
        .assert()
        .success();

    let insights = json_output(vyuha(&dir).args(["--json", "insights"]));
    assert_eq!(insights["scan_events"], 1);
    assert_eq!(insights["act_events"], 1);
    assert_eq!(insights["counts_by_validation_source"]["FALLBACK"], 1);
    assert_eq!(insights["avg_scan_latency_ms"], 120.0);
}

#[test]
fn corrupt_state_file_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".vyuha")).unwrap();
    std::fs::write(dir.path().join(".vyuha/spacecraft.yaml"), "position: [oops").unwrap();
    vyuha(&dir)
        .arg("state")
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupt state file"));
}
