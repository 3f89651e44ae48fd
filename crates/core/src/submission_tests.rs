// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn meta() -> SubmissionMeta {
    SubmissionMeta::new(
        vec!["main.py".into(), "config.yaml".into()],
        UserId::new("alice"),
        "main.py",
        "config.yaml",
    )
}

#[test]
fn contains_checks_listed_files() {
    let meta = meta();
    assert!(meta.contains("main.py"));
    assert!(meta.contains("config.yaml"));
    assert!(!meta.contains("other.py"));
}

#[test]
fn missing_entrypoint_and_config_default() {
    let json = r#"{"files": ["main.py"], "user_id": "alice"}"#;
    let meta: SubmissionMeta = serde_json::from_str(json).unwrap();
    assert_eq!(meta.entrypoint, "main.py");
    assert_eq!(meta.config_file, "config.yaml");
}

#[test]
fn extra_keys_roundtrip() {
    let json = r#"{"files": [], "user_id": "alice", "entrypoint": "run.py",
                   "config_file": "c.yaml", "team": "blue", "attempt": "3"}"#;
    let meta: SubmissionMeta = serde_json::from_str(json).unwrap();
    assert_eq!(meta.extra.get("team").and_then(|v| v.as_str()), Some("blue"));

    let back = serde_json::to_value(&meta).unwrap();
    assert_eq!(back.get("team").and_then(|v| v.as_str()), Some("blue"));
    assert_eq!(back.get("attempt").and_then(|v| v.as_str()), Some("3"));
}

#[test]
fn extra_preserves_insertion_order() {
    let json = r#"{"files": [], "user_id": "u", "z_key": "1", "a_key": "2", "m_key": "3"}"#;
    let meta: SubmissionMeta = serde_json::from_str(json).unwrap();
    let keys: Vec<&str> = meta.extra.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["z_key", "a_key", "m_key"]);
}
