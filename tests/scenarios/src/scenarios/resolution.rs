//! Concurrent server edits and how they settle.

use sync_client::MockTransport;
use sync_core::AutoResolutionPreferences;
use sync_types::{ActionType, ConflictKind, FieldValue, Record, Resolution};

use super::{create_log, edit, server_time};
use crate::assertions::*;
use crate::harness::Device;

#[tokio::test]
async fn mixed_batch_replays_around_a_conflict() {
    let server = MockTransport::new();
    // B: edited on the server after the local edit, mixed strategies.
    server.set_record(
        "/api/logs/b",
        Record::new()
            .with("status", "missed")
            .with("notes", "server note")
            .with("updated_at", server_time(3600)),
    );
    // C: server copy predates the local edit.
    server.set_record(
        "/api/symptoms/c",
        Record::new().with("severity", 1i64).with("updated_at", server_time(-3600)),
    );
    let device = Device::new(server.clone()).await.unwrap();

    device.queue().enqueue(create_log("/api/logs", "taken")).await.unwrap();
    let b = device
        .queue()
        .enqueue(edit(
            ActionType::LogEntry,
            "/api/logs/b",
            "b",
            Record::new().with("status", "taken").with("notes", "local note"),
        ))
        .await
        .unwrap();
    device
        .queue()
        .enqueue(edit(
            ActionType::SymptomEntry,
            "/api/symptoms/c",
            "c",
            Record::new().with("severity", 3i64),
        ))
        .await
        .unwrap();

    let result = device.sync().replay_all(false).await.unwrap();
    assert_eq!((result.success, result.conflicts, result.failed), (2, 1, 0));

    let queued = device.queue().list_all().await.unwrap();
    assert_eq!(queued.iter().map(|a| a.id).collect::<Vec<_>>(), vec![b]);
    let conflicts = device.conflicts().list_unresolved().await.unwrap();
    assert!(assert_conflicts_keep_actions(&conflicts, &queued).passed);
    assert_eq!(conflicts[0].conflict_kind, ConflictKind::UpdateConflict);
}

#[tokio::test]
async fn edits_from_two_devices_merge_on_review() {
    let server = MockTransport::new();
    server.set_record(
        "/api/logs/1",
        Record::new().with("status", "pending").with("notes", "original"),
    );
    let first = Device::new(server.clone()).await.unwrap();
    let second = Device::new(server.clone()).await.unwrap();

    // Both devices edit offline; the second edits the notes.
    first
        .queue()
        .enqueue(edit(ActionType::LogEntry, "/api/logs/1", "1", Record::new().with("status", "taken")))
        .await
        .unwrap();
    second
        .queue()
        .enqueue(edit(ActionType::LogEntry, "/api/logs/1", "1", Record::new().with("notes", "felt dizzy")))
        .await
        .unwrap();

    // The first device syncs; the server stamps its modification time.
    assert_eq!(first.sync().replay_all(false).await.unwrap().success, 1);
    let mut stamped = server.record("/api/logs/1").unwrap();
    stamped.insert("updated_at", server_time(1));
    server.set_record("/api/logs/1", stamped);

    let result = second.sync().replay_all(false).await.unwrap();
    assert_eq!(result.conflicts, 1);

    let conflict = second.conflicts().get(result.conflict_ids[0]).await.unwrap().unwrap();
    let preview = second.sync().get_merge_preview(&conflict).unwrap();
    assert_eq!(preview.merged_data.get("status"), Some(&FieldValue::from("taken")));
    assert_eq!(preview.merged_data.get("notes"), Some(&FieldValue::from("felt dizzy")));

    second
        .sync()
        .resolve_conflict(conflict.id, Resolution::Merge)
        .await
        .unwrap();
    let record = server.record("/api/logs/1").unwrap();
    assert_eq!(record.get("status"), Some(&FieldValue::from("taken")));
    assert_eq!(record.get("notes"), Some(&FieldValue::from("felt dizzy")));
}

#[tokio::test]
async fn disabled_auto_resolution_sends_everything_to_review() {
    let server = MockTransport::new();
    server.set_record(
        "/api/logs/1",
        Record::new().with("status", "missed").with("updated_at", server_time(3600)),
    );
    let device = Device::with_preferences(server.clone(), AutoResolutionPreferences::disabled())
        .await
        .unwrap();
    device
        .queue()
        .enqueue(edit(ActionType::LogEntry, "/api/logs/1", "1", Record::new().with("status", "taken")))
        .await
        .unwrap();

    let result = device.sync().replay_all(false).await.unwrap();
    assert_eq!(result.auto_resolved, 0);
    assert_eq!(result.conflicts, 1);

    device
        .sync()
        .resolve_conflict(result.conflict_ids[0], Resolution::KeepServer)
        .await
        .unwrap();
    assert!(server.submitted().is_empty());
    assert_eq!(device.queue().count().await.unwrap(), 0);
}

#[tokio::test]
async fn deleted_record_is_reviewed_not_resurrected() {
    let server = MockTransport::new();
    let device = Device::new(server.clone()).await.unwrap();
    device
        .queue()
        .enqueue(edit(ActionType::SymptomEntry, "/api/symptoms/9", "9", Record::new().with("severity", 5i64)))
        .await
        .unwrap();

    let result = device.sync().replay_all(false).await.unwrap();
    assert_eq!(result.conflicts, 1);
    let conflict = device.conflicts().get(result.conflict_ids[0]).await.unwrap().unwrap();
    assert_eq!(conflict.conflict_kind, ConflictKind::DeleteConflict);
    assert!(server.record("/api/symptoms/9").is_none());
    assert!(server.submitted().is_empty());
}
