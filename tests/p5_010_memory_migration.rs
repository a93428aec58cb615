// P5-010: Chat memory file upgrades and session bookkeeping
// Test: Open legacy files from disk, modify sessions, reopen
// Expected: Files are rewritten at the current version, data survives, deletes cascade

use serde_json::json;
use std::fs;
use trade_annotator::error::AnnotatorError;
use trade_annotator::memory::schema::{CURRENT_VERSION, IMPORTED_SESSION_TITLE};
use trade_annotator::memory::{MemoryStore, Role};

fn write_json(dir: &tempfile::TempDir, name: &str, value: serde_json::Value) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();
    path
}

fn version_on_disk(path: &std::path::Path) -> u64 {
    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    raw["version"].as_u64().unwrap()
}

#[test]
fn v1_file_is_migrated_into_one_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_json(
        &dir,
        "memory.json",
        json!({"messages": [
            {"role": "user", "content": "Is this a valid BOS?"},
            {"role": "assistant", "content": "Yes, the close broke structure."}
        ]}),
    );

    let store = MemoryStore::open(&path).unwrap();
    assert_eq!(version_on_disk(&path), CURRENT_VERSION as u64);

    let sessions = store.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].title, IMPORTED_SESSION_TITLE);
    let messages = store.messages(&sessions[0].id);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].content, "Yes, the close broke structure.");
}

#[test]
fn empty_v1_file_yields_no_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_json(&dir, "memory.json", json!({"messages": []}));
    let store = MemoryStore::open(&path).unwrap();
    assert!(store.sessions().is_empty());
    assert_eq!(version_on_disk(&path), CURRENT_VERSION as u64);
}

#[test]
fn v2_file_gains_empty_performance_logs() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_json(
        &dir,
        "memory.json",
        json!({
            "version": 2,
            "sessions": [{
                "id": "s1", "title": "EURUSD",
                "created_at": "2026-01-05T10:00:00Z", "updated_at": "2026-01-05T10:05:00Z"
            }],
            "messages": [{
                "id": "m1", "session_id": "s1", "role": "user",
                "content": "Where is the POI?", "created_at": "2026-01-05T10:00:00Z"
            }]
        }),
    );
    let store = MemoryStore::open(&path).unwrap();
    assert!(store.performance_logs().is_empty());
    assert_eq!(store.session("s1").unwrap().title, "EURUSD");
    assert_eq!(store.messages("s1").len(), 1);
}

#[test]
fn unknown_future_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_json(&dir, "memory.json", json!({"version": 9}));
    let err = MemoryStore::open(&path).unwrap_err();
    assert!(matches!(err, AnnotatorError::UnsupportedSchema(9)));
}

#[test]
fn missing_file_starts_empty_and_saves_into_new_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("memory.json");
    let mut store = MemoryStore::open(&path).unwrap();
    assert!(store.sessions().is_empty());

    let session = store.create_session("GBPUSD review");
    store.append_message(&session.id, Role::User, "Mark the BOS").unwrap();
    store.save().unwrap();

    let reopened = MemoryStore::open(&path).unwrap();
    assert_eq!(reopened.sessions()[0].title, "GBPUSD review");
    assert_eq!(reopened.messages(&session.id)[0].content, "Mark the BOS");
}

#[test]
fn delete_cascades_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.json");
    let mut store = MemoryStore::open(&path).unwrap();

    let keep = store.create_session("keep");
    let gone = store.create_session("gone");
    store.append_message(&gone.id, Role::User, "q").unwrap();
    store.append_message(&gone.id, Role::Assistant, "a").unwrap();
    store.append_message(&keep.id, Role::User, "other").unwrap();
    store.log_performance(Some(&gone.id), 850, 1, 1, None);
    store.log_performance(Some(&keep.id), 420, 5, 0, Some("vision-small".into()));

    assert_eq!(store.delete_session(&gone.id).unwrap(), 2);
    store.save().unwrap();

    let reopened = MemoryStore::open(&path).unwrap();
    assert!(reopened.session(&gone.id).is_none());
    assert!(reopened.messages(&gone.id).is_empty());
    assert_eq!(reopened.messages(&keep.id).len(), 1);
    assert_eq!(reopened.performance_logs().len(), 1);
    assert_eq!(reopened.performance_logs()[0].latency_ms, 420);
}

#[test]
fn unknown_session_ids_are_errors() {
    let mut store = MemoryStore::in_memory();
    assert!(matches!(
        store.append_message("nope", Role::User, "hi"),
        Err(AnnotatorError::UnknownSession(_))
    ));
    assert!(matches!(
        store.rename_session("nope", "x"),
        Err(AnnotatorError::UnknownSession(_))
    ));
    assert!(matches!(store.delete_session("nope"), Err(AnnotatorError::UnknownSession(_))));
}

#[test]
fn history_returns_latest_turns_oldest_first() {
    let mut store = MemoryStore::in_memory();
    let s = store.create_session("t");
    for text in ["one", "two", "three", "four"] {
        store.append_message(&s.id, Role::User, text).unwrap();
    }
    let turns: Vec<String> = store.history(&s.id, 2).into_iter().map(|t| t.content).collect();
    assert_eq!(turns, ["three", "four"]);
}
