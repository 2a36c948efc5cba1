/*
[INPUT]:  Scripted behavior from a SimulatedReaderHandle
[OUTPUT]: In-process ReaderCapability implementation plus a call log
[POS]:    Reader layer - software stand-in for card-present hardware
[UPDATE]: When ReaderCapability changes or tests need new scripting hooks
*/

//! Simulated card-present reader.
//!
//! The reader itself implements [`ReaderCapability`]; the paired
//! [`SimulatedReaderHandle`] scripts its behavior: per-operation failures,
//! the status returned by `process_payment`, gates that hold an operation
//! until released, and unexpected disconnects.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Notify, broadcast};
use tracing::debug;
use uuid::Uuid;

use crate::http::{Result, TerminalError};
use crate::reader::{ReaderCapability, ReaderEvent};
use crate::types::{
    ConnectionStatus, DiscoveryOptions, PaymentIntent, PaymentIntentStatus, Reader,
    ReaderDisplay, ReaderStatus, Refund, SimulatorConfiguration,
};

/// Id reported by the simulated reader on discovery
pub const SIMULATOR_READER_ID: &str = "SIMULATOR";

const EVENT_CAPACITY: usize = 16;

/// Reader operations that can be scripted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderOp {
    Discover,
    Connect,
    Disconnect,
    SetDisplay,
    CollectPayment,
    CancelCollectPayment,
    ProcessPayment,
    CollectRefund,
    ProcessRefund,
    CancelCollectRefund,
}

/// One recorded call against the simulated reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderCall {
    Discover { simulated: bool },
    Connect { reader_id: String },
    Disconnect,
    SetDisplay(ReaderDisplay),
    SetSimulatorConfiguration(SimulatorConfiguration),
    CollectPayment { client_secret: String },
    CancelCollectPayment,
    ProcessPayment { intent_id: String },
    CollectRefund {
        charge_id: String,
        amount: i64,
        currency: String,
    },
    ProcessRefund,
    CancelCollectRefund,
}

impl ReaderCall {
    /// Scriptable operation behind this call; `None` for configuration calls
    pub fn op(&self) -> Option<ReaderOp> {
        match self {
            ReaderCall::Discover { .. } => Some(ReaderOp::Discover),
            ReaderCall::Connect { .. } => Some(ReaderOp::Connect),
            ReaderCall::Disconnect => Some(ReaderOp::Disconnect),
            ReaderCall::SetDisplay(_) => Some(ReaderOp::SetDisplay),
            ReaderCall::SetSimulatorConfiguration(_) => None,
            ReaderCall::CollectPayment { .. } => Some(ReaderOp::CollectPayment),
            ReaderCall::CancelCollectPayment => Some(ReaderOp::CancelCollectPayment),
            ReaderCall::ProcessPayment { .. } => Some(ReaderOp::ProcessPayment),
            ReaderCall::CollectRefund { .. } => Some(ReaderOp::CollectRefund),
            ReaderCall::ProcessRefund => Some(ReaderOp::ProcessRefund),
            ReaderCall::CancelCollectRefund => Some(ReaderOp::CancelCollectRefund),
        }
    }
}

#[derive(Debug, Default)]
struct Gate {
    started: Notify,
    release: Notify,
}

#[derive(Debug, Clone)]
struct ScriptedFailure {
    code: Option<String>,
    message: String,
}

#[derive(Debug)]
struct SimState {
    connected: Option<Reader>,
    registered: Vec<Reader>,
    failures: HashMap<ReaderOp, ScriptedFailure>,
    process_status: PaymentIntentStatus,
    calls: Vec<ReaderCall>,
    simulator_config: Option<SimulatorConfiguration>,
    pending_refund: Option<(String, i64, String)>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<SimState>,
    gates: Mutex<HashMap<ReaderOp, Arc<Gate>>>,
    interrupt: Notify,
    events: broadcast::Sender<ReaderEvent>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn gates(&self) -> MutexGuard<'_, HashMap<ReaderOp, Arc<Gate>>> {
        self.gates.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: ReaderCall) {
        debug!(call = ?call, "simulated reader call");
        self.state().calls.push(call);
    }

    fn take_failure(&self, op: ReaderOp) -> Result<()> {
        match self.state().failures.remove(&op) {
            Some(ScriptedFailure {
                code: Some(code),
                message,
            }) => Err(TerminalError::reader_with_code(code, message)),
            Some(ScriptedFailure {
                code: None,
                message,
            }) => Err(TerminalError::reader(message)),
            None => Ok(()),
        }
    }

    fn require_connected(&self) -> Result<Reader> {
        self.state().connected.clone().ok_or_else(|| {
            TerminalError::reader_with_code("no_established_connection", "no reader connected")
        })
    }

    fn emit(&self, event: ReaderEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn pass_gate(&self, op: ReaderOp) {
        let gate = self.gates().get(&op).cloned();
        if let Some(gate) = gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }
    }

    /// Like `pass_gate`, but a cancel or disconnect aborts the wait
    async fn pass_gate_interruptible(&self, op: ReaderOp) -> Result<()> {
        let interrupted = self.interrupt.notified();
        tokio::select! {
            _ = self.pass_gate(op) => Ok(()),
            _ = interrupted => {
                self.gates().remove(&op);
                if self.state().connected.is_none() {
                    Err(TerminalError::reader_with_code("reader_disconnected", "reader disconnected"))
                } else {
                    Err(TerminalError::reader_with_code("canceled", "operation canceled"))
                }
            }
        }
    }
}

/// Simulated card-present reader
#[derive(Debug, Clone)]
pub struct SimulatedReader {
    shared: Arc<Shared>,
}

/// Control handle for a [`SimulatedReader`]
#[derive(Debug, Clone)]
pub struct SimulatedReaderHandle {
    shared: Arc<Shared>,
}

impl SimulatedReader {
    /// Create a simulated reader and its control handle
    pub fn new() -> (Self, SimulatedReaderHandle) {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            state: Mutex::new(SimState {
                connected: None,
                registered: Vec::new(),
                failures: HashMap::new(),
                process_status: PaymentIntentStatus::Succeeded,
                calls: Vec::new(),
                simulator_config: None,
                pending_refund: None,
            }),
            gates: Mutex::new(HashMap::new()),
            interrupt: Notify::new(),
            events,
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            SimulatedReaderHandle { shared },
        )
    }

    /// Reader returned by simulated discovery
    pub fn simulator_reader() -> Reader {
        Reader {
            id: SIMULATOR_READER_ID.to_string(),
            label: Some("Simulated reader".to_string()),
            serial_number: Some("SIMULATOR".to_string()),
            status: Some(ReaderStatus::Online),
            device_type: Some("simulated_wisepos_e".to_string()),
            location: None,
            ip_address: None,
        }
    }
}

impl SimulatedReaderHandle {
    /// Make a reader visible to non-simulated discovery
    pub fn register_reader(&self, reader: Reader) {
        self.shared.state().registered.push(reader);
    }

    /// Fail the next call of `op` with `message`
    pub fn fail_next(&self, op: ReaderOp, message: impl Into<String>) {
        self.shared.state().failures.insert(
            op,
            ScriptedFailure {
                code: None,
                message: message.into(),
            },
        );
    }

    /// Fail the next call of `op` with an SDK error code
    pub fn fail_next_with_code(
        &self,
        op: ReaderOp,
        code: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.shared.state().failures.insert(
            op,
            ScriptedFailure {
                code: Some(code.into()),
                message: message.into(),
            },
        );
    }

    /// Status reported by `process_payment`; `succeeded` unless changed
    pub fn set_process_status(&self, status: PaymentIntentStatus) {
        self.shared.state().process_status = status;
    }

    /// Hold every call of `op` until [`release`](Self::release)
    pub fn hold(&self, op: ReaderOp) {
        self.shared.gates().insert(op, Arc::new(Gate::default()));
    }

    /// Wait until a held `op` has been entered
    pub async fn wait_started(&self, op: ReaderOp) {
        let gate = self.shared.gates().get(&op).cloned();
        if let Some(gate) = gate {
            gate.started.notified().await;
        }
    }

    /// Let a held `op` continue and stop holding it
    pub fn release(&self, op: ReaderOp) {
        if let Some(gate) = self.shared.gates().remove(&op) {
            gate.release.notify_one();
        }
    }

    /// Drop the connection and push an unexpected-disconnect notification
    pub fn trigger_unexpected_disconnect(&self) {
        self.shared.state().connected = None;
        self.shared.interrupt.notify_waiters();
        self.shared.emit(ReaderEvent::UnexpectedDisconnect);
    }

    /// Push an arbitrary reader notification
    pub fn emit(&self, event: ReaderEvent) {
        self.shared.emit(event);
    }

    pub fn calls(&self) -> Vec<ReaderCall> {
        self.shared.state().calls.clone()
    }

    /// Number of recorded calls of `op`
    pub fn call_count(&self, op: ReaderOp) -> usize {
        self.shared
            .state()
            .calls
            .iter()
            .filter(|call| call.op() == Some(op))
            .count()
    }

    /// Every cart pushed to the reader screen, oldest first
    pub fn displays(&self) -> Vec<ReaderDisplay> {
        self.shared
            .state()
            .calls
            .iter()
            .filter_map(|call| match call {
                ReaderCall::SetDisplay(display) => Some(display.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn connected_reader(&self) -> Option<Reader> {
        self.shared.state().connected.clone()
    }

    pub fn simulator_configuration(&self) -> Option<SimulatorConfiguration> {
        self.shared.state().simulator_config.clone()
    }
}

#[async_trait]
impl ReaderCapability for SimulatedReader {
    async fn discover_readers(&self, options: &DiscoveryOptions) -> Result<Vec<Reader>> {
        self.shared.record(ReaderCall::Discover {
            simulated: options.simulated,
        });
        self.shared.pass_gate(ReaderOp::Discover).await;
        self.shared.take_failure(ReaderOp::Discover)?;

        if options.simulated {
            return Ok(vec![SimulatedReader::simulator_reader()]);
        }

        let readers = self
            .shared
            .state()
            .registered
            .iter()
            .filter(|reader| match &options.location {
                Some(location) => reader.location.as_ref() == Some(location),
                None => true,
            })
            .cloned()
            .collect();
        Ok(readers)
    }

    async fn connect_reader(&self, reader: &Reader) -> Result<Reader> {
        self.shared.record(ReaderCall::Connect {
            reader_id: reader.id.clone(),
        });
        self.shared
            .emit(ReaderEvent::ConnectionStatusChanged(ConnectionStatus::Connecting));
        self.shared.pass_gate(ReaderOp::Connect).await;
        self.shared.take_failure(ReaderOp::Connect)?;

        let connected = Reader {
            status: Some(ReaderStatus::Online),
            ..reader.clone()
        };
        self.shared.state().connected = Some(connected.clone());
        self.shared
            .emit(ReaderEvent::ConnectionStatusChanged(ConnectionStatus::Connected));
        Ok(connected)
    }

    async fn disconnect_reader(&self) -> Result<()> {
        self.shared.record(ReaderCall::Disconnect);
        self.shared.pass_gate(ReaderOp::Disconnect).await;
        self.shared.take_failure(ReaderOp::Disconnect)?;
        self.shared.state().connected = None;
        self.shared.interrupt.notify_waiters();
        Ok(())
    }

    async fn set_reader_display(&self, display: &ReaderDisplay) -> Result<()> {
        self.shared.record(ReaderCall::SetDisplay(display.clone()));
        self.shared.require_connected()?;
        self.shared.pass_gate(ReaderOp::SetDisplay).await;
        self.shared.take_failure(ReaderOp::SetDisplay)
    }

    fn set_simulator_configuration(&self, config: &SimulatorConfiguration) {
        self.shared
            .record(ReaderCall::SetSimulatorConfiguration(config.clone()));
        self.shared.state().simulator_config = Some(config.clone());
    }

    async fn collect_payment_method(&self, client_secret: &str) -> Result<PaymentIntent> {
        self.shared.record(ReaderCall::CollectPayment {
            client_secret: client_secret.to_string(),
        });
        self.shared.require_connected()?;
        self.shared
            .pass_gate_interruptible(ReaderOp::CollectPayment)
            .await?;
        self.shared.take_failure(ReaderOp::CollectPayment)?;

        Ok(PaymentIntent {
            id: intent_id_from_secret(client_secret),
            amount: 0,
            currency: String::new(),
            status: PaymentIntentStatus::RequiresConfirmation,
            client_secret: Some(client_secret.to_string()),
            secret: None,
            description: None,
            latest_charge: None,
        })
    }

    async fn cancel_collect_payment_method(&self) -> Result<()> {
        self.shared.record(ReaderCall::CancelCollectPayment);
        self.shared.take_failure(ReaderOp::CancelCollectPayment)?;
        self.shared.interrupt.notify_waiters();
        Ok(())
    }

    async fn process_payment(&self, intent: &PaymentIntent) -> Result<PaymentIntent> {
        self.shared.record(ReaderCall::ProcessPayment {
            intent_id: intent.id.clone(),
        });
        self.shared.require_connected()?;
        self.shared.pass_gate(ReaderOp::ProcessPayment).await;
        self.shared.take_failure(ReaderOp::ProcessPayment)?;

        let status = self.shared.state().process_status;
        Ok(PaymentIntent {
            status,
            latest_charge: Some(format!("ch_sim_{}", Uuid::new_v4().simple())),
            ..intent.clone()
        })
    }

    async fn collect_refund_payment_method(
        &self,
        charge_id: &str,
        amount: i64,
        currency: &str,
    ) -> Result<()> {
        self.shared.record(ReaderCall::CollectRefund {
            charge_id: charge_id.to_string(),
            amount,
            currency: currency.to_string(),
        });
        self.shared.require_connected()?;
        self.shared.state().pending_refund =
            Some((charge_id.to_string(), amount, currency.to_string()));
        self.shared
            .pass_gate_interruptible(ReaderOp::CollectRefund)
            .await?;
        self.shared.take_failure(ReaderOp::CollectRefund)
    }

    async fn process_refund(&self) -> Result<Refund> {
        self.shared.record(ReaderCall::ProcessRefund);
        self.shared.require_connected()?;
        self.shared.pass_gate(ReaderOp::ProcessRefund).await;
        self.shared.take_failure(ReaderOp::ProcessRefund)?;

        let (charge, amount, currency) = self
            .shared
            .state()
            .pending_refund
            .take()
            .ok_or_else(|| TerminalError::reader("no refund payment method collected"))?;
        Ok(Refund {
            id: format!("re_sim_{}", Uuid::new_v4().simple()),
            charge: Some(charge),
            amount,
            currency,
            status: Some("succeeded".to_string()),
        })
    }

    async fn cancel_collect_refund_payment_method(&self) -> Result<()> {
        self.shared.record(ReaderCall::CancelCollectRefund);
        self.shared.take_failure(ReaderOp::CancelCollectRefund)?;
        self.shared.state().pending_refund = None;
        self.shared.interrupt.notify_waiters();
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.shared.events.subscribe()
    }
}

/// `pi_123_secret_abc` -> `pi_123`
fn intent_id_from_secret(secret: &str) -> String {
    secret
        .split_once("_secret_")
        .map(|(id, _)| id)
        .unwrap_or(secret)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_id_from_secret() {
        assert_eq!(intent_id_from_secret("pi_123_secret_abc"), "pi_123");
        assert_eq!(intent_id_from_secret("opaque"), "opaque");
    }

    #[tokio::test]
    async fn test_simulated_discovery_returns_simulator() {
        let (reader, handle) = SimulatedReader::new();
        let readers = reader
            .discover_readers(&DiscoveryOptions::simulated())
            .await
            .expect("discover");

        assert_eq!(readers.len(), 1);
        assert_eq!(readers[0].id, SIMULATOR_READER_ID);
        assert_eq!(handle.call_count(ReaderOp::Discover), 1);
    }

    #[tokio::test]
    async fn test_scripted_failure_is_consumed_once() {
        let (reader, handle) = SimulatedReader::new();
        handle.fail_next_with_code(ReaderOp::Connect, "timeout", "reader busy");

        let err = reader
            .connect_reader(&SimulatedReader::simulator_reader())
            .await
            .unwrap_err();
        assert_eq!(err.reader_code(), Some("timeout"));
        assert!(handle.connected_reader().is_none());

        reader
            .connect_reader(&SimulatedReader::simulator_reader())
            .await
            .expect("second connect");
        assert!(handle.connected_reader().is_some());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_held_collection() {
        let (reader, handle) = SimulatedReader::new();
        reader
            .connect_reader(&SimulatedReader::simulator_reader())
            .await
            .expect("connect");
        handle.hold(ReaderOp::CollectPayment);

        let collecting = {
            let reader = reader.clone();
            tokio::spawn(async move { reader.collect_payment_method("pi_1_secret_x").await })
        };
        handle.wait_started(ReaderOp::CollectPayment).await;
        reader
            .cancel_collect_payment_method()
            .await
            .expect("cancel");

        let err = collecting.await.expect("join").unwrap_err();
        assert_eq!(err.reader_code(), Some("canceled"));
    }

    #[tokio::test]
    async fn test_unexpected_disconnect_is_broadcast() {
        let (reader, handle) = SimulatedReader::new();
        let mut events = reader.subscribe();
        handle.trigger_unexpected_disconnect();

        assert_eq!(
            events.recv().await.expect("event"),
            ReaderEvent::UnexpectedDisconnect
        );
    }
}
