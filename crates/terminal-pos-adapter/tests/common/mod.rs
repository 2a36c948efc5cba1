/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for terminal-pos-adapter tests

use terminal_pos_adapter::{ClientConfig, TerminalBackendClient};
use wiremock::MockServer;

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Backend client pointed at the mock server
#[allow(dead_code)]
pub fn backend_client(server: &MockServer) -> TerminalBackendClient {
    TerminalBackendClient::with_config(ClientConfig::default(), &server.uri())
        .expect("client init")
}

/// Payment intent body as returned by the demo backend
#[allow(dead_code)]
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
