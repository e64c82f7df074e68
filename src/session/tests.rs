use super::*;

use std::thread::sleep;

use chrono::NaiveDate;
use tempfile::TempDir;

fn turn(question: &str, answer: &str, second: u32) -> ConversationTurn {
    let base = NaiveDate::from_ymd_opt(2024, 5, 17)
        .expect("valid date")
        .and_hms_opt(10, 30, second)
        .expect("valid time");
    ConversationTurn {
        question: question.to_string(),
        answer: answer.to_string(),
        asked_at: base,
        answered_at: base,
    }
}

fn store(dir: &TempDir, max_turns: usize) -> SessionStore {
    SessionStore::new(dir.path().join("sessions"), max_turns).expect("store should initialize")
}

#[test]
fn turn_serializes_to_the_documented_layout() {
    let json = serde_json::to_value(turn("What is X?", "X is Y.", 5)).expect("serialize");

    assert_eq!(json["question"], "What is X?");
    assert_eq!(json["answer"], "X is Y.");
    assert_eq!(json["user_time"], "2024-05-17 10:30:05");
    assert_eq!(json["bot_time"], "2024-05-17 10:30:05");
}

#[test]
fn identity_is_stable_across_store_instances() {
    let dir = TempDir::new().expect("tempdir");

    let first = store(&dir, 10).create_or_resume().expect("create session");
    let second = store(&dir, 10).create_or_resume().expect("resume session");

    assert_eq!(first, second);
}

#[test]
fn malformed_marker_allocates_a_fresh_identity() {
    let dir = TempDir::new().expect("tempdir");
    let sessions = store(&dir, 10);

    std::fs::write(
        dir.path().join("sessions").join("active_session"),
        "not-a-uuid",
    )
    .expect("write marker");

    let id = sessions.create_or_resume().expect("create session");
    let resumed = sessions.create_or_resume().expect("resume session");
    assert_eq!(id, resumed);
}

#[test]
fn load_recent_on_fresh_session_is_empty() {
    let dir = TempDir::new().expect("tempdir");
    let sessions = store(&dir, 10);
    let id = sessions.create_or_resume().expect("create session");

    let turns = sessions.load_recent(id, 10).expect("load should succeed");
    assert!(turns.is_empty());
}

#[test]
fn turns_round_trip_across_store_instances() {
    let dir = TempDir::new().expect("tempdir");
    let id = {
        let sessions = store(&dir, 10);
        let id = sessions.create_or_resume().expect("create session");
        sessions
            .append_turn(id, turn("q1", "a1", 1))
            .expect("append");
        sessions
            .append_turn(id, turn("q2", "a2", 2))
            .expect("append");
        id
    };

    // Fresh store over the same directory simulates a process restart.
    let sessions = store(&dir, 10);
    let turns = sessions.load_recent(id, 10).expect("load should succeed");

    assert_eq!(turns, vec![turn("q1", "a1", 1), turn("q2", "a2", 2)]);
}

#[test]
fn history_is_capped_at_max_turns() {
    let dir = TempDir::new().expect("tempdir");
    let sessions = store(&dir, 10);
    let id = sessions.create_or_resume().expect("create session");

    for i in 0..15 {
        sessions
            .append_turn(id, turn(&format!("q{i}"), &format!("a{i}"), i))
            .expect("append");
    }

    let turns = sessions.load_recent(id, 10).expect("load should succeed");
    assert_eq!(turns.len(), 10);
    assert_eq!(turns[0].question, "q5");
    assert_eq!(turns[9].question, "q14");
}

#[test]
fn load_recent_returns_only_the_tail() {
    let dir = TempDir::new().expect("tempdir");
    let sessions = store(&dir, 10);
    let id = sessions.create_or_resume().expect("create session");

    for i in 0..5 {
        sessions
            .append_turn(id, turn(&format!("q{i}"), "a", i))
            .expect("append");
    }

    let turns = sessions.load_recent(id, 2).expect("load should succeed");
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].question, "q3");
    assert_eq!(turns[1].question, "q4");
}

#[test]
fn corrupt_history_degrades_to_empty() {
    let dir = TempDir::new().expect("tempdir");
    let sessions = store(&dir, 10);
    let id = sessions.create_or_resume().expect("create session");

    sessions.append_turn(id, turn("q", "a", 0)).expect("append");

    let history_path = dir
        .path()
        .join("sessions")
        .join(id.to_string())
        .join("history.json");
    std::fs::write(&history_path, "{ not json").expect("corrupt the file");

    let turns = sessions.load_recent(id, 10).expect("load should succeed");
    assert!(turns.is_empty());

    // Appending after corruption starts a fresh history.
    sessions
        .append_turn(id, turn("q2", "a2", 1))
        .expect("append");
    let turns = sessions.load_recent(id, 10).expect("load should succeed");
    assert_eq!(turns.len(), 1);
}

#[test]
fn no_partial_history_file_is_left_behind() {
    let dir = TempDir::new().expect("tempdir");
    let sessions = store(&dir, 10);
    let id = sessions.create_or_resume().expect("create session");

    sessions.append_turn(id, turn("q", "a", 0)).expect("append");

    let session_dir = dir.path().join("sessions").join(id.to_string());
    let entries: Vec<_> = std::fs::read_dir(&session_dir)
        .expect("session dir exists")
        .map(|e| e.expect("entry").file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("history.json")]);
}

#[test]
fn clear_removes_storage_and_is_idempotent() {
    let dir = TempDir::new().expect("tempdir");
    let sessions = store(&dir, 10);
    let id = sessions.create_or_resume().expect("create session");

    sessions.append_turn(id, turn("q", "a", 0)).expect("append");
    sessions.clear(id).expect("clear should succeed");

    let turns = sessions.load_recent(id, 10).expect("load should succeed");
    assert!(turns.is_empty());

    // Second clear on already-missing storage is fine.
    sessions.clear(id).expect("clear should be idempotent");
}

#[test]
fn reap_removes_stale_sessions_and_keeps_fresh_ones() {
    let dir = TempDir::new().expect("tempdir");
    let sessions = store(&dir, 10);
    let id = sessions.create_or_resume().expect("create session");
    sessions.append_turn(id, turn("q", "a", 0)).expect("append");

    // A generous window keeps everything.
    let removed = sessions.reap_expired(1).expect("reap should succeed");
    assert_eq!(removed, 0);
    assert_eq!(
        sessions.load_recent(id, 10).expect("load").len(),
        1,
        "fresh session must survive reaping"
    );

    // A zero-day window makes anything written before this instant stale.
    sleep(std::time::Duration::from_millis(20));
    let removed = sessions.reap_expired(0).expect("reap should succeed");
    assert_eq!(removed, 1);
    assert!(sessions.load_recent(id, 10).expect("load").is_empty());
}
