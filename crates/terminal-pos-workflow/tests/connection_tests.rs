/*
[INPUT]:  Simulated reader discovery/connection scripts and mocked backend
[OUTPUT]: Verification of the reader connection state machine
[POS]:    Integration tests - connection workflow
[UPDATE]: When discovery, registration, or disconnect handling changes
*/

mod common;

use std::sync::Arc;

use common::{connected_harness, harness, wait_for_session};
use terminal_pos_adapter::{
    ConnectionStatus, DiscoveryOptions, Reader, ReaderEvent, ReaderOp, ReaderStatus,
    SIMULATOR_READER_ID,
};
use terminal_pos_workflow::{ConnectionState, DiscoveryOutcome, WorkflowConfig, WorkflowError};
use tokio_test::assert_ok;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, ResponseTemplate};

fn counter_reader(id: &str) -> Reader {
    Reader {
        id: id.to_string(),
        label: Some("Front counter".to_string()),
        serial_number: Some("WSC513102004166".to_string()),
        status: Some(ReaderStatus::Online),
        device_type: Some("bbpos_wisepos_e".to_string()),
        location: Some("tml_main".to_string()),
        ip_address: Some("192.168.1.20".to_string()),
    }
}

#[tokio::test]
async fn test_discover_stores_candidates() {
    let h = harness(WorkflowConfig::default()).await;
    h.reader.register_reader(counter_reader("tmr_1"));

    let outcome = assert_ok!(h.controller.discover(&DiscoveryOptions::default()).await);

    assert!(matches!(&outcome, DiscoveryOutcome::Found(readers) if readers.len() == 1));
    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.connection, ConnectionState::NotConnected);
    assert_eq!(snapshot.discovered_readers[0].id, "tmr_1");
}

#[tokio::test]
async fn test_cancelled_discovery_keeps_candidates() {
    let h = harness(WorkflowConfig::default()).await;
    h.reader.register_reader(counter_reader("tmr_1"));
    h.reader.hold(ReaderOp::Discover);

    let task = {
        let controller = Arc::clone(&h.controller);
        tokio::spawn(async move { controller.discover(&DiscoveryOptions::default()).await })
    };
    h.reader.wait_started(ReaderOp::Discover).await;
    assert_eq!(h.controller.snapshot().connection, ConnectionState::Discovering);

    assert_ok!(h.controller.cancel_discovery());
    h.reader.release(ReaderOp::Discover);

    let outcome = assert_ok!(task.await.expect("join"));
    assert_eq!(outcome, DiscoveryOutcome::Cancelled);
    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.connection, ConnectionState::NotConnected);
    assert!(snapshot.discovered_readers.is_empty());
}

#[tokio::test]
async fn test_discovery_after_cancelled_discovery_finds_readers() {
    let h = harness(WorkflowConfig::default()).await;
    h.reader.register_reader(counter_reader("tmr_1"));
    h.reader.hold(ReaderOp::Discover);

    let task = {
        let controller = Arc::clone(&h.controller);
        tokio::spawn(async move { controller.discover(&DiscoveryOptions::default()).await })
    };
    h.reader.wait_started(ReaderOp::Discover).await;
    assert_ok!(h.controller.cancel_discovery());
    h.reader.release(ReaderOp::Discover);
    assert_eq!(assert_ok!(task.await.expect("join")), DiscoveryOutcome::Cancelled);

    let outcome = assert_ok!(h.controller.discover(&DiscoveryOptions::default()).await);

    assert!(matches!(&outcome, DiscoveryOutcome::Found(readers) if readers.len() == 1));
    assert_eq!(h.controller.snapshot().discovered_readers.len(), 1);
}

#[tokio::test]
async fn test_discovery_failure_returns_to_not_connected() {
    let h = harness(WorkflowConfig::default()).await;
    h.reader.fail_next(ReaderOp::Discover, "bluetooth disabled");

    let err = h
        .controller
        .discover(&DiscoveryOptions::simulated())
        .await
        .unwrap_err();

    assert!(err.is_reader_error());
    assert_eq!(h.controller.snapshot().connection, ConnectionState::NotConnected);
}

#[tokio::test]
async fn test_connect_to_discovered_reader() {
    let h = harness(WorkflowConfig::default()).await;
    h.reader.register_reader(counter_reader("tmr_1"));
    let DiscoveryOutcome::Found(readers) =
        assert_ok!(h.controller.discover(&DiscoveryOptions::default()).await)
    else {
        panic!("discovery cancelled");
    };

    let handle = assert_ok!(h.controller.connect(&readers[0]).await);

    assert_eq!(handle.id, "tmr_1");
    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.connection, ConnectionState::Connected);
    assert_eq!(snapshot.reader.as_ref().map(|r| r.id.as_str()), Some("tmr_1"));
    assert!(!snapshot.using_simulator);
    assert!(snapshot.discovered_readers.is_empty());
}

#[tokio::test]
async fn test_connect_to_simulator_sets_flag() {
    let h = connected_harness(WorkflowConfig::default()).await;

    let snapshot = h.controller.snapshot();
    assert!(snapshot.using_simulator);
    assert_eq!(
        snapshot.reader.as_ref().map(|r| r.id.as_str()),
        Some(SIMULATOR_READER_ID)
    );
    assert_eq!(
        h.reader.connected_reader().map(|r| r.id),
        Some(SIMULATOR_READER_ID.to_string())
    );
}

#[tokio::test]
async fn test_register_and_connect() {
    let h = harness(WorkflowConfig::default()).await;
    Mock::given(method("POST"))
        .and(path("/register_reader"))
        .and(body_string("label=Front+counter&registration_code=simulated-wpe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "tmr_9",
            "label": "Front counter",
            "status": "online",
            "location": { "id": "tml_default" }
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let handle = assert_ok!(
        h.controller
            .register_and_connect("Front counter", "simulated-wpe", None)
            .await
    );

    assert_eq!(handle.id, "tmr_9");
    assert_eq!(handle.location.as_deref(), Some("tml_default"));
    assert_eq!(h.controller.snapshot().connection, ConnectionState::Connected);
}

#[tokio::test]
async fn test_register_failure_leaves_session_untouched() {
    let h = harness(WorkflowConfig::default()).await;
    Mock::given(method("POST"))
        .and(path("/register_reader"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid registration code"))
        .mount(&h.server)
        .await;

    let err = h
        .controller
        .register_and_connect("Front counter", "bad-code", Some("tml_1".to_string()))
        .await
        .unwrap_err();

    assert!(err.is_backend_error());
    assert_eq!(h.controller.snapshot().connection, ConnectionState::NotConnected);
    assert_eq!(h.reader.call_count(ReaderOp::Connect), 0);
}

#[tokio::test]
async fn test_verify_reader_refreshes_status() {
    let h = connected_harness(WorkflowConfig::default()).await;
    Mock::given(method("POST"))
        .and(path("/verify_terminal_connection"))
        .and(body_string(format!("reader_id={SIMULATOR_READER_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": SIMULATOR_READER_ID,
            "status": "offline"
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let handle = assert_ok!(h.controller.verify_reader().await);

    assert_eq!(handle.status, Some(ReaderStatus::Offline));
    let snapshot = h.controller.snapshot();
    assert_eq!(
        snapshot.reader.and_then(|r| r.status),
        Some(ReaderStatus::Offline)
    );
}

#[tokio::test]
async fn test_verify_requires_connection() {
    let h = harness(WorkflowConfig::default()).await;
    assert!(matches!(
        h.controller.verify_reader().await,
        Err(WorkflowError::NotConnected)
    ));
}

#[tokio::test]
async fn test_explicit_disconnect() {
    let h = connected_harness(WorkflowConfig::default()).await;

    assert_ok!(h.controller.disconnect().await);

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.connection, ConnectionState::NotConnected);
    assert!(snapshot.reader.is_none());
    assert!(h.reader.connected_reader().is_none());
    assert!(matches!(
        h.controller.disconnect().await,
        Err(WorkflowError::NotConnected)
    ));
}

#[tokio::test]
async fn test_unexpected_disconnect_notification() {
    let h = connected_harness(WorkflowConfig::default()).await;

    h.reader.trigger_unexpected_disconnect();

    let snapshot = wait_for_session(&h.controller, |s| {
        s.connection == ConnectionState::NotConnected
    })
    .await;
    assert!(snapshot.reader.is_none());
    assert!(!snapshot.using_simulator);

    // Idempotent when already disconnected
    h.controller
        .handle_reader_event(&ReaderEvent::UnexpectedDisconnect);
    assert_eq!(h.controller.snapshot().connection, ConnectionState::NotConnected);

    // Reconnect works afterwards
    assert_ok!(h.controller.connect_to_simulator().await);
}

#[tokio::test]
async fn test_connection_status_events() {
    let h = connected_harness(WorkflowConfig::default()).await;

    h.controller
        .handle_reader_event(&ReaderEvent::ConnectionStatusChanged(ConnectionStatus::Connecting));
    assert_eq!(h.controller.snapshot().connection, ConnectionState::Connected);

    h.reader
        .emit(ReaderEvent::ConnectionStatusChanged(ConnectionStatus::NotConnected));
    let snapshot = wait_for_session(&h.controller, |s| {
        s.connection == ConnectionState::NotConnected
    })
    .await;
    assert!(snapshot.reader.is_none());
}
