/*
[INPUT]:  Payments backend operations required by the workflow controller
[OUTPUT]: PaymentsBackend trait and its HTTP implementation
[POS]:    HTTP layer - seam between workflow logic and the backend transport
[UPDATE]: When the controller needs a new backend capability
*/

use async_trait::async_trait;

use crate::http::{Result, TerminalBackendClient};
use crate::types::{
    ConnectionToken, CreatePaymentIntentRequest, Location, PaymentIntent, Reader,
    RegisterReaderRequest,
};

/// Remote payments backend capability
#[async_trait]
pub trait PaymentsBackend: Send + Sync {
    async fn create_connection_token(&self) -> Result<ConnectionToken>;
    async fn register_reader(&self, req: &RegisterReaderRequest) -> Result<Reader>;
    async fn create_payment_intent(&self, req: &CreatePaymentIntentRequest) -> Result<PaymentIntent>;
    async fn capture_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent>;
    async fn cancel_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent>;
    async fn list_locations(&self) -> Result<Vec<Location>>;
    async fn verify_reader(&self, reader_id: &str) -> Result<Reader>;
    async fn disconnect_reader(&self, reader_id: &str) -> Result<Reader>;
}

#[async_trait]
impl PaymentsBackend for TerminalBackendClient {
    async fn create_connection_token(&self) -> Result<ConnectionToken> {
        TerminalBackendClient::create_connection_token(self).await
    }

    async fn register_reader(&self, req: &RegisterReaderRequest) -> Result<Reader> {
        TerminalBackendClient::register_reader(self, req).await
    }

    async fn create_payment_intent(&self, req: &CreatePaymentIntentRequest) -> Result<PaymentIntent> {
        TerminalBackendClient::create_payment_intent(self, req).await
    }

    async fn capture_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent> {
        TerminalBackendClient::capture_payment_intent(self, payment_intent_id).await
    }

    async fn cancel_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent> {
        TerminalBackendClient::cancel_payment_intent(self, payment_intent_id).await
    }

    async fn list_locations(&self) -> Result<Vec<Location>> {
        TerminalBackendClient::list_locations(self).await
    }

    async fn verify_reader(&self, reader_id: &str) -> Result<Reader> {
        self.verify_terminal_connection(reader_id).await
    }

    async fn disconnect_reader(&self, reader_id: &str) -> Result<Reader> {
        self.disconnect_terminal(reader_id).await
    }
}
