//! Restarts between enqueue and sync.

use std::time::Duration;
use sync_client::MockTransport;
use sync_types::{ActionType, Record, Resolution};

use super::{create_log, edit, server_time};
use crate::assertions::*;
use crate::harness::Device;

#[tokio::test]
async fn queued_actions_survive_restart() {
    let mut device = Device::new(MockTransport::new()).await.unwrap();
    let urls = ["/api/logs", "/api/symptoms", "/api/messages"];
    for url in urls {
        device.queue().enqueue(create_log(url, "taken")).await.unwrap();
    }

    device.restart().await.unwrap();
    assert_eq!(device.launches(), 2);
    assert!(device.database().exists());

    let queued = device.queue().list_all().await.unwrap();
    assert_eq!(queued.len(), 3);
    let order = assert_queue_order(&queued);
    assert!(order.passed, "{:?}", order.failure_details);

    let result = device.sync().replay_all(false).await.unwrap();
    assert_eq!(result.success, 3);

    let submitted = device.server().submitted();
    let replayed: Vec<&str> = submitted.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(replayed, urls);
    let lost = assert_no_action_lost(&urls, &submitted, &[]);
    assert!(lost.passed, "{:?}", lost.failure_details);
}

#[tokio::test]
async fn ids_keep_increasing_across_restarts() {
    let mut device = Device::new(MockTransport::new()).await.unwrap();
    let first = device.queue().enqueue(create_log("/api/logs", "a")).await.unwrap();
    device.sync().replay_all(false).await.unwrap();

    device.restart().await.unwrap();
    let second = device.queue().enqueue(create_log("/api/logs", "b")).await.unwrap();
    assert!(second > first);
}

#[tokio::test]
async fn open_conflict_survives_restart() {
    let server = MockTransport::new();
    server.set_record(
        "/api/logs/7",
        Record::new()
            .with("status", "missed")
            .with("notes", "server")
            .with("updated_at", server_time(3600)),
    );
    let mut device = Device::new(server).await.unwrap();
    device
        .queue()
        .enqueue(edit(
            ActionType::LogEntry,
            "/api/logs/7",
            "7",
            Record::new().with("status", "taken").with("notes", "local"),
        ))
        .await
        .unwrap();

    let first = device.sync().replay_all(false).await.unwrap();
    assert_eq!(first.conflicts, 1);

    device.restart().await.unwrap();
    let second = device.sync().replay_all(false).await.unwrap();
    assert_eq!(second.conflict_ids, first.conflict_ids);

    let conflicts = device.conflicts().list_all().await.unwrap();
    let queued = device.queue().list_all().await.unwrap();
    assert!(assert_one_open_conflict_per_action(&conflicts).passed);
    assert!(assert_conflicts_keep_actions(&conflicts, &queued).passed);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(device.notifier().seen().len(), 1);

    device
        .sync()
        .resolve_conflict(first.conflict_ids[0], Resolution::KeepLocal)
        .await
        .unwrap();
    let record = device.server().record("/api/logs/7").unwrap();
    assert_eq!(record.get("notes").and_then(|v| v.as_str()), Some("local"));
    assert_eq!(device.queue().count().await.unwrap(), 0);
}
