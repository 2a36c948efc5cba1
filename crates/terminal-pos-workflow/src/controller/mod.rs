/*
[INPUT]:  ReaderCapability, PaymentsBackend, WorkflowConfig, reader event stream
[OUTPUT]: WorkflowController driving connection, payment, and refund workflows
[POS]:    Orchestration layer - session state machine
[UPDATE]: When adding workflows or changing how reader notifications apply
*/

//! Workflow controller.
//!
//! Owns the [`Session`] and sequences every reader and backend call. All
//! methods take `&self`: the session sits behind a synchronous mutex that is
//! only held between awaits, so cancel calls run while a collection is still
//! waiting on the reader.

mod connection;
mod payment;
mod refund;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use terminal_pos_adapter::{ConnectionStatus, PaymentsBackend, ReaderCapability, ReaderEvent};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cart::Cart;
use crate::config::WorkflowConfig;
use crate::error::{Result, WorkflowError};
use crate::session::{Session, SessionSnapshot, Workflow};

pub use connection::DiscoveryOutcome;
pub use payment::{CaptureMode, PaymentOutcome, WorkflowWarning, payment_method_types};
pub use refund::RefundRequest;

struct Inner {
    reader: Arc<dyn ReaderCapability>,
    backend: Arc<dyn PaymentsBackend>,
    config: WorkflowConfig,
    session: Mutex<Session>,
    discovery_cancelled: AtomicBool,
}

impl Inner {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_reader_event(&self, event: &ReaderEvent) {
        match event {
            ReaderEvent::UnexpectedDisconnect
            | ReaderEvent::ConnectionStatusChanged(ConnectionStatus::NotConnected) => {
                let mut session = self.session();
                let reader_id = session.reader.as_ref().map(|reader| reader.id.clone());
                session.clear_connection();
                session.clear_payment_state();
                warn!(reader_id = ?reader_id, event = ?event, "reader disconnected unexpectedly");
            }
            ReaderEvent::ConnectionStatusChanged(status) => {
                debug!(status = ?status, "reader connection status changed");
            }
        }
    }
}

/// Clears the workflow marker on every exit path
struct WorkflowGuard<'a> {
    inner: &'a Inner,
}

impl Drop for WorkflowGuard<'_> {
    fn drop(&mut self) {
        self.inner.session().workflow = None;
    }
}

/// Session state machine for one point-of-sale client
pub struct WorkflowController {
    inner: Arc<Inner>,
    listener: JoinHandle<()>,
}

impl WorkflowController {
    /// Create a controller and start applying reader notifications.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(
        reader: Arc<dyn ReaderCapability>,
        backend: Arc<dyn PaymentsBackend>,
        config: WorkflowConfig,
    ) -> Self {
        let events = reader.subscribe();
        let inner = Arc::new(Inner {
            reader,
            backend,
            session: Mutex::new(Session::new(config.backend_url.clone())),
            config,
            discovery_cancelled: AtomicBool::new(false),
        });
        let listener = tokio::spawn(listen(Arc::downgrade(&inner), events));
        Self { inner, listener }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.inner.config
    }

    /// Copy of the session for rendering
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.session().clone()
    }

    /// Empty cart in the configured default currency
    pub fn new_cart(&self) -> Cart {
        Cart::new(self.inner.config.payment.default_currency.as_str())
    }

    /// Apply a reader notification immediately, bypassing the event stream
    pub fn handle_reader_event(&self, event: &ReaderEvent) {
        self.inner.apply_reader_event(event);
    }

    fn begin_workflow(&self, workflow: Workflow, require_reader: bool) -> Result<WorkflowGuard<'_>> {
        let mut session = self.inner.session();
        if let Some(active) = session.workflow {
            return Err(WorkflowError::WorkflowBusy { active });
        }
        if session.cancelable_payment {
            return Err(WorkflowError::WorkflowBusy {
                active: Workflow::CollectPayment,
            });
        }
        if session.cancelable_refund {
            return Err(WorkflowError::WorkflowBusy {
                active: Workflow::CollectRefund,
            });
        }
        if require_reader && !session.is_connected() {
            return Err(WorkflowError::NotConnected);
        }
        session.workflow = Some(workflow);
        Ok(WorkflowGuard { inner: &self.inner })
    }
}

impl Drop for WorkflowController {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn listen(inner: Weak<Inner>, mut events: broadcast::Receiver<ReaderEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                inner.apply_reader_event(&event);
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "reader events dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
