/*
[INPUT]:  Public API exports for terminal-pos-workflow crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod cart;
pub mod config;
pub mod controller;
pub mod error;
pub mod session;

// Re-export main types for convenience
pub use cart::{Cart, LineItem};
pub use config::{CaptureFailurePolicy, WorkflowConfig};
pub use controller::{
    CaptureMode, DiscoveryOutcome, PaymentOutcome, RefundRequest, WorkflowController,
    WorkflowWarning,
};
pub use error::{Result, WorkflowError};
pub use session::{
    ConnectionState, IntentStage, PendingPaymentIntent, PendingRefund, ReaderHandle, Session,
    SessionSnapshot, Workflow,
};
