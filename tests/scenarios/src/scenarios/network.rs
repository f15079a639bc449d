//! Failures, latency and interrupted runs.

use std::time::Duration;
use sync_client::{MockTransport, TransportError};
use sync_types::{ActionType, FieldValue, Record};

use super::{create_log, edit};
use crate::assertions::*;
use crate::harness::Device;

#[tokio::test]
async fn flaky_network_converges_without_duplicates() {
    let server = MockTransport::new();
    let device = Device::new(server.clone()).await.unwrap();
    let urls = ["/api/logs/a", "/api/logs/b", "/api/logs/c", "/api/logs/d"];
    for url in urls {
        device.queue().enqueue(create_log(url, "taken")).await.unwrap();
    }

    server.fail_url("/api/logs/b", TransportError::Timeout);
    server.fail_url("/api/logs/d", TransportError::Connection("reset".into()));

    let first = device.sync().replay_all(false).await.unwrap();
    assert_eq!(first.success, 2);
    assert_eq!(first.failed, 2);

    let queued = device.queue().list_all().await.unwrap();
    let lost = assert_no_action_lost(&urls, &server.submitted(), &queued);
    assert!(lost.passed, "{:?}", lost.failure_details);

    server.heal_url("/api/logs/b");
    server.heal_url("/api/logs/d");
    let second = device.sync().replay_all(false).await.unwrap();
    assert_eq!(second.success, 2);
    assert_eq!(device.queue().count().await.unwrap(), 0);

    let duplicates = assert_no_duplicate_replays(&server.submitted());
    assert!(duplicates.passed, "{:?}", duplicates.failure_details);
}

#[tokio::test]
async fn failed_server_check_is_retried() {
    let server = MockTransport::new();
    server.set_record("/api/symptoms/1", Record::new().with("severity", 2i64));
    let device = Device::new(server.clone()).await.unwrap();
    device
        .queue()
        .enqueue(edit(
            ActionType::SymptomEntry,
            "/api/symptoms/1",
            "1",
            Record::new().with("severity", 4i64),
        ))
        .await
        .unwrap();

    server.fail_next_fetch(TransportError::Http {
        status: 503,
        body: "maintenance".into(),
    });
    let first = device.sync().replay_all(false).await.unwrap();
    assert_eq!(first.failed, 1);
    assert!(server.submitted().is_empty());

    let second = device.sync().replay_all(false).await.unwrap();
    assert_eq!(second.success, 1);
    let record = server.record("/api/symptoms/1").unwrap();
    assert_eq!(record.get("severity"), Some(&FieldValue::Integer(4)));
}

#[tokio::test]
async fn interrupted_run_resumes_after_restart() {
    let server = MockTransport::new();
    let mut device = Device::new(server.clone()).await.unwrap();
    let urls = ["/api/logs/1", "/api/logs/2", "/api/logs/3"];
    for url in urls {
        device.queue().enqueue(create_log(url, "taken")).await.unwrap();
    }
    server.set_latency(Duration::from_millis(400));

    let abort = device.sync().abort_handle();
    let (result, ()) = tokio::join!(device.sync().replay_all(false), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        abort.abort();
    });
    let result = result.unwrap();
    assert!(result.aborted);
    assert_eq!(result.success, 1);

    server.set_latency(Duration::ZERO);
    device.restart().await.unwrap();
    let resumed = device.sync().replay_all(false).await.unwrap();
    assert!(!resumed.aborted);
    assert_eq!(resumed.success, 2);

    let submitted = server.submitted();
    assert!(assert_no_duplicate_replays(&submitted).passed);
    assert!(assert_no_action_lost(&urls, &submitted, &[]).passed);
}
