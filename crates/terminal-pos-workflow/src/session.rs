/*
[INPUT]:  State transitions applied by the workflow controller
[OUTPUT]: Session record and the snapshot handed to the presentation layer
[POS]:    Domain layer - session state
[UPDATE]: When session fields or state invariants change
*/

use std::fmt;

use serde::{Deserialize, Serialize};
use terminal_pos_adapter::{Reader, ReaderStatus, SIMULATOR_READER_ID};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    NotConnected,
    Discovering,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::NotConnected => "not connected",
            ConnectionState::Discovering => "discovering",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Connected reader as recorded in the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderHandle {
    pub id: String,
    pub label: Option<String>,
    pub serial_number: Option<String>,
    pub status: Option<ReaderStatus>,
    pub device_type: Option<String>,
    pub location: Option<String>,
    pub ip_address: Option<String>,
}

impl ReaderHandle {
    pub fn is_simulator(&self) -> bool {
        self.id == SIMULATOR_READER_ID
    }
}

impl From<&Reader> for ReaderHandle {
    fn from(reader: &Reader) -> Self {
        Self {
            id: reader.id.clone(),
            label: reader.label.clone(),
            serial_number: reader.serial_number.clone(),
            status: reader.status,
            device_type: reader.device_type.clone(),
            location: reader.location.clone(),
            ip_address: reader.ip_address.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStage {
    AwaitingCollection,
    /// Processed on the reader, capture failed and the intent was kept
    AwaitingCapture,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPaymentIntent {
    pub id: String,
    #[serde(skip_serializing, default)]
    pub secret: String,
    pub amount_minor_units: i64,
    pub currency: String,
    pub stage: IntentStage,
}

impl PendingPaymentIntent {
    pub fn matches(&self, amount_minor_units: i64, currency: &str) -> bool {
        self.amount_minor_units == amount_minor_units && self.currency.eq_ignore_ascii_case(currency)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRefund {
    pub charge_id: String,
    /// Minor currency units
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workflow {
    CollectPayment,
    CollectRefund,
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Workflow::CollectPayment => f.write_str("collect_payment"),
            Workflow::CollectRefund => f.write_str("collect_refund"),
        }
    }
}

/// Session state owned by one controller.
///
/// Cloned out as the snapshot the presentation layer renders from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub connection: ConnectionState,
    pub reader: Option<ReaderHandle>,
    pub backend_url: String,
    pub using_simulator: bool,
    pub discovered_readers: Vec<Reader>,
    pub pending_payment: Option<PendingPaymentIntent>,
    pub pending_refund: Option<PendingRefund>,
    pub cancelable_payment: bool,
    pub cancelable_refund: bool,
    pub workflow: Option<Workflow>,
}

pub type SessionSnapshot = Session;

impl Session {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            connection: ConnectionState::NotConnected,
            reader: None,
            backend_url: backend_url.into(),
            using_simulator: false,
            discovered_readers: Vec::new(),
            pending_payment: None,
            pending_refund: None,
            cancelable_payment: false,
            cancelable_refund: false,
            workflow: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    /// Payment and refund actions are disabled while a workflow runs
    pub fn is_workflow_disabled(&self) -> bool {
        self.workflow.is_some()
    }

    pub(crate) fn set_connected(&mut self, reader: &Reader) {
        let handle = ReaderHandle::from(reader);
        self.using_simulator = handle.is_simulator();
        self.reader = Some(handle);
        self.connection = ConnectionState::Connected;
        self.discovered_readers.clear();
        self.check_invariants();
    }

    pub(crate) fn clear_connection(&mut self) {
        self.connection = ConnectionState::NotConnected;
        self.reader = None;
        self.using_simulator = false;
        self.check_invariants();
    }

    /// Drop every payment and refund in flight
    pub(crate) fn clear_payment_state(&mut self) {
        self.pending_payment = None;
        self.cancelable_payment = false;
        self.pending_refund = None;
        self.cancelable_refund = false;
        self.check_invariants();
    }

    /// Clear the pending intent only if it is still `intent_id`
    pub(crate) fn clear_pending_payment(&mut self, intent_id: &str) -> bool {
        let matches = self
            .pending_payment
            .as_ref()
            .is_some_and(|pending| pending.id == intent_id);
        if matches {
            self.pending_payment = None;
            self.cancelable_payment = false;
        }
        self.check_invariants();
        matches
    }

    pub(crate) fn check_invariants(&self) {
        debug_assert_eq!(
            self.reader.is_some(),
            self.connection == ConnectionState::Connected,
            "reader handle must be present exactly when connected"
        );
        debug_assert!(
            !self.cancelable_payment || self.pending_payment.is_some(),
            "cancelable payment without a pending intent"
        );
        debug_assert!(
            !self.cancelable_refund || self.pending_refund.is_some(),
            "cancelable refund without a pending refund"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terminal_pos_adapter::SimulatedReader;

    fn pending(id: &str) -> PendingPaymentIntent {
        PendingPaymentIntent {
            id: id.to_string(),
            secret: format!("{id}_secret_x"),
            amount_minor_units: 2100,
            currency: "usd".to_string(),
            stage: IntentStage::AwaitingCollection,
        }
    }

    #[test]
    fn test_connect_records_simulator() {
        let mut session = Session::new("http://localhost:4242/");
        session.discovered_readers.push(SimulatedReader::simulator_reader());
        session.set_connected(&SimulatedReader::simulator_reader());

        assert!(session.is_connected());
        assert!(session.using_simulator);
        assert!(session.discovered_readers.is_empty());

        session.clear_connection();
        assert!(session.reader.is_none());
        assert!(!session.using_simulator);
    }

    #[test]
    fn test_clear_pending_only_when_id_matches() {
        let mut session = Session::new("http://localhost:4242/");
        session.pending_payment = Some(pending("pi_2"));
        session.cancelable_payment = true;

        assert!(!session.clear_pending_payment("pi_1"));
        assert!(session.pending_payment.is_some());

        assert!(session.clear_pending_payment("pi_2"));
        assert!(session.pending_payment.is_none());
        assert!(!session.cancelable_payment);
    }

    #[test]
    fn test_pending_intent_match_ignores_currency_case() {
        let intent = pending("pi_1");
        assert!(intent.matches(2100, "USD"));
        assert!(!intent.matches(2000, "usd"));
        assert!(!intent.matches(2100, "cad"));
    }

    #[test]
    fn test_snapshot_hides_intent_secret() {
        let mut session = Session::new("http://localhost:4242/");
        session.pending_payment = Some(pending("pi_1"));
        let value = serde_json::to_value(&session).expect("serialize");

        assert_eq!(value["connection"], "not_connected");
        assert_eq!(value["pending_payment"]["id"], "pi_1");
        assert!(value["pending_payment"].get("secret").is_none());
    }
}
