use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn quick_next(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_quick-next"))
        .args(args)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run quick-next")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "quick-next failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn replay_reports_final_state() {
    let home = TempDir::new().expect("tempdir");
    let trace = home.path().join("trace.json");
    std::fs::write(
        &trace,
        r#"{
            "page": {"remaining_pages": 1},
            "events": [
                {"at_ms": 1100, "event": {"type": "click"}},
                {"at_ms": 1700, "event": {"type": "click"}},
                {"at_ms": 1800, "event": {"type": "popup", "request": {"protocol_version": 1, "command": "trigger_next", "id": "a"}}}
            ]
        }"#,
    )
    .expect("write trace");

    let report = stdout_json(&quick_next(home.path(), &["replay", trace.to_str().unwrap()]));
    assert_eq!(report["state"], "disabled");
    assert_eq!(report["native_activations"], 1);
    assert_eq!(report["clicks"][1], "not_clickable");
    assert_eq!(report["popup_responses"][0]["data"], "not_found");
    assert_eq!(report["position"], serde_json::json!({"bottom": "20px", "right": "20px"}));
}

#[test]
fn replay_rejects_malformed_trace() {
    let home = TempDir::new().expect("tempdir");
    let trace = home.path().join("trace.json");
    std::fs::write(&trace, "{\"events\": 3}").expect("write trace");

    let output = quick_next(home.path(), &["replay", trace.to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn position_set_show_reset() {
    let home = TempDir::new().expect("tempdir");
    let storage = home.path().join("storage.json");
    let storage = storage.to_str().unwrap();

    let set = stdout_json(&quick_next(
        home.path(),
        &["position", "set", "--left", "37", "--top", "84", "--storage", storage],
    ));
    assert_eq!(set["position"], serde_json::json!({"left": "37px", "top": "84px"}));

    let shown = stdout_json(&quick_next(home.path(), &["position", "show", "--storage", storage]));
    assert_eq!(shown["position"], set["position"]);

    let reset = stdout_json(&quick_next(home.path(), &["position", "reset", "--storage", storage]));
    assert_eq!(reset["position"], serde_json::json!({"bottom": "20px", "right": "20px"}));
}

#[test]
fn check_url_reports_both_predicates() {
    let home = TempDir::new().expect("tempdir");
    let report = stdout_json(&quick_next(
        home.path(),
        &["check-url", "https://www.linkedin.com/jobs/search/?keywords=rust"],
    ));
    assert_eq!(report["target_page"], true);
    assert_eq!(report["popup_active"], true);

    let feed = stdout_json(&quick_next(home.path(), &["check-url", "https://www.linkedin.com/feed/"]));
    assert_eq!(feed["target_page"], false);
    assert_eq!(feed["popup_active"], false);
}
