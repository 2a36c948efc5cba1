/*
[INPUT]:  Payment intent amounts, currencies, intent ids
[OUTPUT]: Payment intents (created, captured, cancelled)
[POS]:    HTTP layer - payment intent endpoints
[UPDATE]: When payment intent lifecycle or request fields change
*/

use tracing::info;

use crate::http::{Result, TerminalBackendClient};
use crate::types::{CreatePaymentIntentRequest, PaymentIntent};

impl TerminalBackendClient {
    /// Create a payment intent for a card-present charge
    ///
    /// POST /create_payment_intent
    pub async fn create_payment_intent(
        &self,
        req: &CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent> {
        let intent: PaymentIntent = self
            .post_form("/create_payment_intent", &req.form_fields())
            .await?;
        info!(
            intent_id = %intent.id,
            amount = req.amount,
            currency = %req.currency,
            "payment intent created"
        );
        Ok(intent)
    }

    /// Capture an authorized payment intent
    ///
    /// POST /capture_payment_intent
    pub async fn capture_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent> {
        let intent: PaymentIntent = self
            .post_form(
                "/capture_payment_intent",
                &[("payment_intent_id", payment_intent_id.to_string())],
            )
            .await?;
        info!(intent_id = %intent.id, status = ?intent.status, "payment intent captured");
        Ok(intent)
    }

    /// Cancel a payment intent that has not been captured
    ///
    /// POST /cancel_payment_intent
    pub async fn cancel_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent> {
        let intent: PaymentIntent = self
            .post_form(
                "/cancel_payment_intent",
                &[("payment_intent_id", payment_intent_id.to_string())],
            )
            .await?;
        info!(intent_id = %intent.id, "payment intent cancelled");
        Ok(intent)
    }
}
