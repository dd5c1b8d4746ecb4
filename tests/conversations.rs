//! Conversation reconstruction over the JSONL audit log, end to end.

use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;

use sitechat::audit::{AuditLog, JsonlAuditLog, MemoryAuditLog};
use sitechat::conversation::Segmenter;
use sitechat::models::AuditLogEntry;

fn entry(id: i64, minutes: i64, path: &str, payload: &str) -> AuditLogEntry {
    AuditLogEntry {
        id,
        path: path.to_string(),
        method: "POST".to_string(),
        payload: payload.to_string(),
        requester_id: None,
        created_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes),
    }
}

#[test]
fn test_ask_response_pairs_form_one_conversation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.jsonl");
    let log = JsonlAuditLog::open(&path).unwrap();

    log.append("/ask", "POST", "what do you do?", None).unwrap();
    log.append("/ask:response", "POST", "I build software.", None)
        .unwrap();
    log.append("/ask", "POST", "where?", None).unwrap();
    log.append("/ask:response", "POST", "In Oslo.", None).unwrap();

    let segmenter = Segmenter::new(&log);
    let summaries = segmenter.list_conversations(None, None).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].id, 1);
    assert_eq!(summaries[0].message_count, 4);
    assert_eq!(summaries[0].preview, "what do you do?");

    let conv = segmenter.get_conversation(1, None, None).unwrap().unwrap();
    let roles: Vec<&str> = conv.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec!["user", "assistant", "user", "assistant"]);
}

#[test]
fn test_segmentation_survives_log_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.jsonl");
    {
        let log = JsonlAuditLog::open(&path).unwrap();
        log.append("/ask", "POST", "first session", None).unwrap();
    }
    let log = JsonlAuditLog::open(&path).unwrap();
    log.append("/ask", "POST", "still same session", None).unwrap();

    let segmenter = Segmenter::new(&log);
    let summaries = segmenter.list_conversations(None, None).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].message_count, 2);
}

#[test]
fn test_memory_log_fixed_timestamps_partition() {
    let log = MemoryAuditLog::new();
    log.push_raw(entry(1, 0, "/ask", "q1"));
    log.push_raw(entry(2, 5, "/ask:response", "a1"));
    log.push_raw(entry(3, 12, "/ask", "q2"));
    log.push_raw(entry(4, 60, "/ask", "q3"));

    let segmenter = Segmenter::new(&log);
    let summaries = segmenter
        .list_conversations(Some(Duration::minutes(20)), None)
        .unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].message_count, 3);
    assert_eq!(summaries[1].message_count, 1);
    assert_eq!(summaries[1].preview, "q3");
}

#[test]
fn test_requester_scoped_view_renumbers_from_one() {
    let log = MemoryAuditLog::new();
    log.append("/ask", "POST", "alice asks", Some("alice")).unwrap();
    log.append("/ask", "POST", "bob asks", Some("bob")).unwrap();

    let segmenter = Segmenter::new(&log);
    let bob = segmenter.list_conversations(None, Some("bob")).unwrap();
    assert_eq!(bob.len(), 1);
    assert_eq!(bob[0].id, 1);
    assert_eq!(bob[0].preview, "bob asks");

    let conv = segmenter
        .get_conversation(1, None, Some("bob"))
        .unwrap()
        .unwrap();
    assert_eq!(conv.messages.len(), 1);
    assert_eq!(conv.messages[0].text, "bob asks");
}
