/*
[INPUT]:  Reader SDK primitives (discovery, connection, collection, refunds)
[OUTPUT]: ReaderCapability trait and out-of-band reader events
[POS]:    Reader layer - contract between the workflow controller and a terminal
[UPDATE]: When the terminal SDK surface used by workflows changes
*/

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::http::Result;
use crate::types::{
    ConnectionStatus, DiscoveryOptions, PaymentIntent, Reader, ReaderDisplay, Refund,
    SimulatorConfiguration,
};

/// Notifications pushed by the reader outside of any request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    /// The reader dropped the connection without being asked to
    UnexpectedDisconnect,
    /// The SDK connection status moved
    ConnectionStatusChanged(ConnectionStatus),
}

/// Card-present terminal as seen by the workflow controller.
///
/// Every call resolves either with its result or with
/// `TerminalError::ReaderOperationFailed`. Cancel calls unblock an in-flight
/// collection, which then fails through its own error path.
#[async_trait]
pub trait ReaderCapability: Send + Sync {
    async fn discover_readers(&self, options: &DiscoveryOptions) -> Result<Vec<Reader>>;

    async fn connect_reader(&self, reader: &Reader) -> Result<Reader>;

    async fn disconnect_reader(&self) -> Result<()>;

    async fn set_reader_display(&self, display: &ReaderDisplay) -> Result<()>;

    /// Test-mode settings for the next collection; only meaningful on a simulator
    fn set_simulator_configuration(&self, config: &SimulatorConfiguration);

    async fn collect_payment_method(&self, client_secret: &str) -> Result<PaymentIntent>;

    async fn cancel_collect_payment_method(&self) -> Result<()>;

    async fn process_payment(&self, intent: &PaymentIntent) -> Result<PaymentIntent>;

    async fn collect_refund_payment_method(
        &self,
        charge_id: &str,
        amount: i64,
        currency: &str,
    ) -> Result<()>;

    async fn process_refund(&self) -> Result<Refund>;

    async fn cancel_collect_refund_payment_method(&self) -> Result<()>;

    /// Subscribe to out-of-band reader notifications
    fn subscribe(&self) -> broadcast::Receiver<ReaderEvent>;
}
