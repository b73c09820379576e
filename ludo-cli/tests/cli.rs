use std::fs;
use std::process::Command;

use serde_json::Value;

fn ludo_bin() -> String {
    env!("CARGO_BIN_EXE_ludo").to_string()
}

#[test]
fn version_prints_crate_version() {
    let out = Command::new(ludo_bin()).arg("--version").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_command_fails() {
    let out = Command::new(ludo_bin()).arg("frobnicate").output().unwrap();
    assert!(!out.status.success());
}

#[test]
fn board_json_lists_warps() {
    let out = Command::new(ludo_bin()).args(["board", "--json"]).output().unwrap();
    assert!(out.status.success());
    let spaces: Vec<Value> = serde_json::from_slice(&out.stdout).unwrap();
    let warps: Vec<(i64, i64)> = spaces
        .iter()
        .filter(|s| s["kind"] == "warp")
        .map(|s| (s["position"].as_i64().unwrap(), s["warp_target"].as_i64().unwrap()))
        .collect();
    assert!(warps.contains(&(4, 24)));
    assert!(warps.contains(&(34, 14)));
}

#[test]
fn simulate_writes_events_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("cfg.yaml");
    let events = dir.path().join("events.ndjson");
    let summary = dir.path().join("summary.json");
    fs::write(&cfg, "chance:\n  mode: deterministic\n").unwrap();

    let out = Command::new(ludo_bin())
        .args(["simulate", "--games", "2", "--seed", "7", "--config"])
        .arg(&cfg)
        .arg("--events")
        .arg(&events)
        .arg("--summary")
        .arg(&summary)
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Matches: 2 (2 finished)"));

    let text = fs::read_to_string(&events).unwrap();
    let starts = text
        .lines()
        .map(|l| serde_json::from_str::<Value>(l).unwrap())
        .filter(|e| e["event"] == "game_start")
        .count();
    assert_eq!(starts, 2);

    let s: Value = serde_json::from_str(&fs::read_to_string(&summary).unwrap()).unwrap();
    assert_eq!(s["seed"], 8);
    assert_eq!(s["completed"], true);
    assert!(s["config_hash"].is_string());
}

#[test]
fn online_demo_reports_agreement() {
    let out = Command::new(ludo_bin()).args(["online-demo", "--seed", "3"]).output().unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Replicas agree."));
}
