/*
[INPUT]:  Cart, connected reader, payments backend
[OUTPUT]: Collected, processed, and captured payment intents
[POS]:    Orchestration layer - card-present payment collection
[UPDATE]: When the collection sequence, capture handling, or intent reuse rules change
*/

use serde::Serialize;
use terminal_pos_adapter::{
    CreatePaymentIntentRequest, PaymentIntent, PaymentMethodType, TerminalError,
};
use tracing::{info, warn};

use super::WorkflowController;
use crate::cart::Cart;
use crate::config::CaptureFailurePolicy;
use crate::error::{Result, WorkflowError};
use crate::session::{IntentStage, PendingPaymentIntent, Workflow};

/// How the payment was finalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Reader processing already captured the funds
    Automatic,
    /// Captured through the backend after processing
    Manual,
}

/// Non-fatal problems hit while the payment went through
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowWarning {
    DisplayUpdateFailed { reason: String },
    StaleIntentNotCancelled { intent_id: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentOutcome {
    pub intent: PaymentIntent,
    pub capture: CaptureMode,
    pub warnings: Vec<WorkflowWarning>,
}

/// `card_present`, plus `interac_present` for the regional debit currency
pub fn payment_method_types(currency: &str, regional_debit_currency: &str) -> Vec<PaymentMethodType> {
    let mut types = vec![PaymentMethodType::CardPresent];
    if currency.trim().eq_ignore_ascii_case(regional_debit_currency.trim()) {
        types.push(PaymentMethodType::InteracPresent);
    }
    types
}

impl WorkflowController {
    /// Show the cart, then collect, process, and capture a card-present payment.
    ///
    /// A pending intent for the same amount and currency is reused, so a
    /// failed collection can be retried without creating a new intent.
    pub async fn collect_card_payment(&self, cart: &Cart) -> Result<PaymentOutcome> {
        let _guard = self.begin_workflow(Workflow::CollectPayment, true)?;
        let outstanding = self
            .inner
            .session()
            .pending_payment
            .as_ref()
            .filter(|pending| pending.stage == IntentStage::AwaitingCapture)
            .map(|pending| pending.id.clone());
        if let Some(intent_id) = outstanding {
            return Err(WorkflowError::CaptureOutstanding { intent_id });
        }
        cart.validate()?;
        let amount = cart.total_minor_units()?;
        let display = cart.to_reader_display()?;
        let mut warnings = Vec::new();

        if let Err(err) = self.inner.reader.set_reader_display(&display).await {
            warn!(error = %err, "failed to update reader display");
            warnings.push(WorkflowWarning::DisplayUpdateFailed {
                reason: err.to_string(),
            });
        }

        let result = self.run_collection(cart, amount, &mut warnings).await;
        match result {
            Ok((intent, capture)) => Ok(PaymentOutcome {
                intent,
                capture,
                warnings,
            }),
            Err(err) => {
                if !warnings.is_empty() {
                    warn!(warnings = ?warnings, "payment failed after earlier warnings");
                }
                Err(err)
            }
        }
    }

    async fn run_collection(
        &self,
        cart: &Cart,
        amount: i64,
        warnings: &mut Vec<WorkflowWarning>,
    ) -> Result<(PaymentIntent, CaptureMode)> {
        let pending = self.ensure_pending_intent(cart, amount, warnings).await?;

        let using_simulator = {
            let mut session = self.inner.session();
            if !session.is_connected() {
                return Err(WorkflowError::NotConnected);
            }
            session.cancelable_payment = true;
            session.check_invariants();
            session.using_simulator
        };
        if using_simulator {
            let simulator = self.inner.config.simulator.to_configuration();
            self.inner.reader.set_simulator_configuration(&simulator);
        }

        info!(intent_id = %pending.id, amount, currency = %pending.currency, "collecting payment method");
        let collected = self.inner.reader.collect_payment_method(&pending.secret).await;

        {
            let mut session = self.inner.session();
            let still_pending = session
                .pending_payment
                .as_ref()
                .is_some_and(|current| current.id == pending.id);
            if !still_pending {
                // Cleared by a cancel or an unexpected disconnect.
                if !session.is_connected() {
                    return Err(match collected {
                        Err(err) => err.into(),
                        Ok(_) => WorkflowError::NotConnected,
                    });
                }
                info!(intent_id = %pending.id, "payment collection canceled");
                return Err(WorkflowError::PaymentCanceled);
            }
            session.cancelable_payment = false;
            session.check_invariants();
        }

        let collected = collected.map_err(|err| {
            warn!(intent_id = %pending.id, error = %err, "collect payment method failed");
            err
        })?;

        let processed = self
            .inner
            .reader
            .process_payment(&collected)
            .await
            .map_err(|err| {
                warn!(intent_id = %pending.id, error = %err, "process payment failed");
                err
            })?;

        if processed.status.is_succeeded() {
            self.inner.session().clear_pending_payment(&pending.id);
            info!(intent_id = %processed.id, "payment succeeded");
            return Ok((processed, CaptureMode::Automatic));
        }

        info!(intent_id = %processed.id, status = ?processed.status, "capturing payment intent");
        match self.inner.backend.capture_payment_intent(&processed.id).await {
            Ok(captured) => {
                self.inner.session().clear_pending_payment(&pending.id);
                info!(intent_id = %captured.id, "payment captured");
                Ok((captured, CaptureMode::Manual))
            }
            Err(err) => {
                self.apply_capture_failure(&pending.id);
                warn!(intent_id = %processed.id, error = %err, "payment capture failed");
                Err(err.into())
            }
        }
    }

    /// Reuse the pending intent if it still fits the cart, else replace it
    async fn ensure_pending_intent(
        &self,
        cart: &Cart,
        amount: i64,
        warnings: &mut Vec<WorkflowWarning>,
    ) -> Result<PendingPaymentIntent> {
        let existing = self.inner.session().pending_payment.clone();
        if let Some(existing) = existing {
            if existing.matches(amount, cart.currency()) {
                info!(intent_id = %existing.id, "reusing pending payment intent");
                return Ok(existing);
            }
            self.inner.session().clear_pending_payment(&existing.id);
            info!(
                intent_id = %existing.id,
                old_amount = existing.amount_minor_units,
                new_amount = amount,
                "cart changed, replacing pending payment intent"
            );
            if self.inner.config.payment.cancel_abandoned_intents {
                if let Err(err) = self.inner.backend.cancel_payment_intent(&existing.id).await {
                    warn!(intent_id = %existing.id, error = %err, "failed to cancel stale payment intent");
                    warnings.push(WorkflowWarning::StaleIntentNotCancelled {
                        intent_id: existing.id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let request = CreatePaymentIntentRequest {
            amount,
            currency: cart.currency().to_string(),
            description: self.inner.config.payment.description.clone(),
            payment_method_types: payment_method_types(
                cart.currency(),
                &self.inner.config.payment.regional_debit_currency,
            ),
        };
        let intent = self.inner.backend.create_payment_intent(&request).await?;
        let secret = intent.collection_secret().ok_or_else(|| {
            TerminalError::InvalidResponse(format!("payment intent {} has no client secret", intent.id))
        })?;

        let pending = PendingPaymentIntent {
            id: intent.id.clone(),
            secret: secret.to_string(),
            amount_minor_units: amount,
            currency: cart.currency().to_string(),
            stage: IntentStage::AwaitingCollection,
        };
        let mut session = self.inner.session();
        if !session.is_connected() {
            warn!(intent_id = %pending.id, "reader lost while creating payment intent");
            return Err(WorkflowError::NotConnected);
        }
        session.pending_payment = Some(pending.clone());
        session.check_invariants();
        Ok(pending)
    }

    fn apply_capture_failure(&self, intent_id: &str) {
        let mut session = self.inner.session();
        match self.inner.config.payment.capture_failure_policy {
            CaptureFailurePolicy::ClearPending => {
                session.clear_pending_payment(intent_id);
            }
            CaptureFailurePolicy::RetainForRetry => {
                if let Some(pending) = session
                    .pending_payment
                    .as_mut()
                    .filter(|pending| pending.id == intent_id)
                {
                    pending.stage = IntentStage::AwaitingCapture;
                }
            }
        }
    }

    /// Stop an in-flight collection.
    ///
    /// The pending intent and flag are cleared before the reader is asked to
    /// cancel, so they are gone even when that call fails.
    pub async fn cancel_pending_payment(&self) -> Result<()> {
        let intent_id = {
            let mut session = self.inner.session();
            if !session.cancelable_payment {
                return Err(WorkflowError::NotCancelable("no payment collection in progress"));
            }
            session.cancelable_payment = false;
            let intent_id = session.pending_payment.take().map(|pending| pending.id);
            session.check_invariants();
            intent_id
        };

        let result = self.inner.reader.cancel_collect_payment_method().await;

        if let Some(intent_id) = &intent_id {
            if self.inner.config.payment.cancel_abandoned_intents {
                match self.inner.backend.cancel_payment_intent(intent_id).await {
                    Ok(_) => info!(intent_id = %intent_id, "abandoned payment intent cancelled"),
                    Err(err) => {
                        warn!(intent_id = %intent_id, error = %err, "failed to cancel abandoned payment intent")
                    }
                }
            }
        }

        result.map_err(|err| {
            warn!(error = %err, "reader cancel collect payment method failed");
            err.into()
        })
    }

    /// Capture a processed intent that a previous capture failed on
    pub async fn retry_capture(&self) -> Result<PaymentOutcome> {
        let _guard = self.begin_workflow(Workflow::CollectPayment, false)?;
        let intent_id = {
            let session = self.inner.session();
            match &session.pending_payment {
                Some(pending) if pending.stage == IntentStage::AwaitingCapture => pending.id.clone(),
                _ => return Err(WorkflowError::NothingToCapture),
            }
        };

        info!(intent_id = %intent_id, "retrying payment capture");
        let captured = self
            .inner
            .backend
            .capture_payment_intent(&intent_id)
            .await
            .map_err(|err| {
                warn!(intent_id = %intent_id, error = %err, "payment capture retry failed");
                err
            })?;
        self.inner.session().clear_pending_payment(&intent_id);
        Ok(PaymentOutcome {
            intent: captured,
            capture: CaptureMode::Manual,
            warnings: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interac_only_for_regional_currency() {
        assert_eq!(
            payment_method_types("usd", "cad"),
            vec![PaymentMethodType::CardPresent]
        );
        assert_eq!(
            payment_method_types("CAD", "cad"),
            vec![
                PaymentMethodType::CardPresent,
                PaymentMethodType::InteracPresent
            ]
        );
    }
}
