/*
[INPUT]:  Charge id, refund amount, optional currency
[OUTPUT]: Processed refunds and pending-refund state transitions
[POS]:    Orchestration layer - card-present refund collection
[UPDATE]: When the refund sequence or its validation changes
*/

use serde::{Deserialize, Serialize};
use terminal_pos_adapter::Refund;
use tracing::{info, warn};

use super::WorkflowController;
use crate::error::{Result, WorkflowError};
use crate::session::{PendingRefund, Workflow};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequest {
    pub charge_id: String,
    /// Minor currency units
    pub amount: i64,
    /// Defaults to the configured refund currency
    #[serde(default)]
    pub currency: Option<String>,
}

impl WorkflowController {
    /// Collect the refunded card on the reader and process the refund
    pub async fn collect_refund(&self, request: RefundRequest) -> Result<Refund> {
        let _guard = self.begin_workflow(Workflow::CollectRefund, true)?;

        let charge_id = request.charge_id.trim();
        if charge_id.is_empty() {
            return Err(WorkflowError::validation("charge id is required"));
        }
        if request.amount <= 0 {
            return Err(WorkflowError::validation("refund amount must be positive"));
        }
        let currency = request
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|currency| !currency.is_empty())
            .unwrap_or(self.inner.config.refund.default_currency.as_str())
            .to_ascii_lowercase();

        let pending = PendingRefund {
            charge_id: charge_id.to_string(),
            amount: request.amount,
            currency,
        };
        {
            let mut session = self.inner.session();
            if !session.is_connected() {
                return Err(WorkflowError::NotConnected);
            }
            session.pending_refund = Some(pending.clone());
            session.cancelable_refund = true;
            session.check_invariants();
        }

        info!(
            charge_id = %pending.charge_id,
            amount = pending.amount,
            currency = %pending.currency,
            "collecting refund payment method"
        );
        let collected = self
            .inner
            .reader
            .collect_refund_payment_method(&pending.charge_id, pending.amount, &pending.currency)
            .await;

        {
            let mut session = self.inner.session();
            if session.pending_refund.as_ref() != Some(&pending) {
                if !session.is_connected() {
                    return Err(match collected {
                        Err(err) => err.into(),
                        Ok(()) => WorkflowError::NotConnected,
                    });
                }
                info!(charge_id = %pending.charge_id, "refund collection canceled");
                return Err(WorkflowError::RefundCanceled);
            }
            session.cancelable_refund = false;
            session.check_invariants();
        }

        if let Err(err) = collected {
            warn!(charge_id = %pending.charge_id, error = %err, "collect refund payment method failed");
            return Err(err.into());
        }

        let refund = self.inner.reader.process_refund().await.map_err(|err| {
            warn!(charge_id = %pending.charge_id, error = %err, "process refund failed");
            err
        })?;

        {
            let mut session = self.inner.session();
            if session.pending_refund.as_ref() == Some(&pending) {
                session.pending_refund = None;
            }
            session.check_invariants();
        }
        info!(refund_id = %refund.id, charge_id = %pending.charge_id, "refund processed");
        Ok(refund)
    }

    /// Stop an in-flight refund collection; state is cleared even if the reader call fails
    pub async fn cancel_pending_refund(&self) -> Result<()> {
        {
            let mut session = self.inner.session();
            if !session.cancelable_refund {
                return Err(WorkflowError::NotCancelable("no refund collection in progress"));
            }
            session.cancelable_refund = false;
            session.pending_refund = None;
            session.check_invariants();
        }

        self.inner
            .reader
            .cancel_collect_refund_payment_method()
            .await
            .map_err(|err| {
                warn!(error = %err, "reader cancel collect refund failed");
                err.into()
            })
    }
}
