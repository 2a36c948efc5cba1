/*
[INPUT]:  Mock backend server and simulated reader
[OUTPUT]: Shared harness, fixtures, and mock helpers for workflow tests
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for terminal-pos-workflow tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use terminal_pos_adapter::{SimulatedReader, SimulatedReaderHandle, TerminalBackendClient};
use terminal_pos_workflow::{Cart, LineItem, SessionSnapshot, WorkflowConfig, WorkflowController};
use wiremock::matchers::{body_string, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct Harness {
    pub server: MockServer,
    pub controller: Arc<WorkflowController>,
    pub reader: SimulatedReaderHandle,
}

/// Controller wired to a fresh mock backend and simulated reader
pub async fn harness(config: WorkflowConfig) -> Harness {
    let server = MockServer::start().await;
    let (reader, handle) = SimulatedReader::new();
    let backend = TerminalBackendClient::new(&server.uri()).expect("client init");
    let config = WorkflowConfig {
        backend_url: server.uri(),
        ..config
    };
    let controller = WorkflowController::new(Arc::new(reader), Arc::new(backend), config);
    Harness {
        server,
        controller: Arc::new(controller),
        reader: handle,
    }
}

/// Harness already connected to the simulated reader
pub async fn connected_harness(config: WorkflowConfig) -> Harness {
    let harness = harness(config).await;
    harness
        .controller
        .connect_to_simulator()
        .await
        .expect("connect to simulator");
    harness
}

/// Scenario A cart: 2 x 10.00 + 1.00 tax
pub fn widget_cart(currency: &str) -> Cart {
    Cart::new(currency)
        .with_item(LineItem::new("Widget", dec!(10.00), 2))
        .with_tax(dec!(1.00))
}

pub fn intent_json(id: &str, amount: i64, currency: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "amount": amount,
        "currency": currency,
        "status": status,
        "client_secret": format!("{id}_secret_test"),
        "secret": format!("{id}_secret_test"),
        "paymentIntentId": id,
    })
}

/// Backend creates `id` once for any intent request
pub async fn mount_create_intent(server: &MockServer, id: &str, amount: i64, currency: &str) {
    Mock::given(method("POST"))
        .and(path("/create_payment_intent"))
        .and(body_string_contains(format!("amount={amount}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(intent_json(
            id,
            amount,
            currency,
            "requires_payment_method",
        )))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

pub async fn mount_capture(server: &MockServer, id: &str, status: u16) {
    let response = if status == 200 {
        ResponseTemplate::new(200).set_body_json(intent_json(id, 2100, "usd", "succeeded"))
    } else {
        ResponseTemplate::new(status).set_body_string(r#"{"error":"capture failed"}"#)
    };
    Mock::given(method("POST"))
        .and(path("/capture_payment_intent"))
        .and(body_string(format!("payment_intent_id={id}")))
        .respond_with(response)
        .mount(server)
        .await;
}

pub async fn mount_cancel(server: &MockServer, id: &str) {
    Mock::given(method("POST"))
        .and(path("/cancel_payment_intent"))
        .and(body_string(format!("payment_intent_id={id}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(intent_json(id, 2100, "usd", "canceled")),
        )
        .mount(server)
        .await;
}

/// Bodies of every request the backend received on `endpoint`
pub async fn request_bodies(server: &MockServer, endpoint: &str) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == endpoint)
        .map(|request| String::from_utf8_lossy(&request.body).into_owned())
        .collect()
}

/// Poll the session until `predicate` holds or a second passes
pub async fn wait_for_session<F>(controller: &WorkflowController, predicate: F) -> SessionSnapshot
where
    F: Fn(&SessionSnapshot) -> bool,
{
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let snapshot = controller.snapshot();
            if predicate(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("session never reached the expected state")
}
