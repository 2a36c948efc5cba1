/*
[INPUT]:  Adapter errors and session precondition violations
[OUTPUT]: WorkflowError surfaced by every controller operation
[POS]:    Error handling layer - workflow crate
[UPDATE]: When adding workflow states or new rejection reasons
*/

use terminal_pos_adapter::TerminalError;
use thiserror::Error;

use crate::session::{ConnectionState, Workflow};

#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Backend, reader, or input validation failure
    #[error(transparent)]
    Terminal(#[from] TerminalError),

    #[error("No reader connected")]
    NotConnected,

    /// Operation not allowed in the current connection state
    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: ConnectionState,
    },

    #[error("Workflow already in progress: {active}")]
    WorkflowBusy { active: Workflow },

    #[error("Nothing to cancel: {0}")]
    NotCancelable(&'static str),

    /// A processed payment is still waiting for capture
    #[error("Payment intent {intent_id} is awaiting capture")]
    CaptureOutstanding { intent_id: String },

    #[error("No payment intent awaiting capture")]
    NothingToCapture,

    #[error("Payment canceled")]
    PaymentCanceled,

    #[error("Refund canceled")]
    RefundCanceled,

    #[error("Reader discovery cancelled")]
    DiscoveryCancelled,
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        WorkflowError::Terminal(TerminalError::Validation(message.into()))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, WorkflowError::Terminal(TerminalError::Validation(_)))
    }

    pub fn is_backend_error(&self) -> bool {
        matches!(self, WorkflowError::Terminal(err) if err.is_backend_error())
    }

    pub fn is_reader_error(&self) -> bool {
        matches!(self, WorkflowError::Terminal(err) if err.is_reader_error())
    }

    /// Precondition failures that left the session untouched
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            WorkflowError::NotConnected
                | WorkflowError::InvalidState { .. }
                | WorkflowError::WorkflowBusy { .. }
                | WorkflowError::NotCancelable(_)
                | WorkflowError::CaptureOutstanding { .. }
                | WorkflowError::NothingToCapture
        )
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
