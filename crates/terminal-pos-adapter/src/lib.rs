/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public terminal POS adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod http;
pub mod reader;
pub mod types;

// Re-export commonly used types from http
pub use http::{
    ClientConfig,
    DEFAULT_BACKEND_URL,
    PaymentsBackend,
    Result,
    TerminalBackendClient,
    TerminalError,
};

// Re-export commonly used types from reader
pub use reader::{
    ReaderCall,
    ReaderCapability,
    ReaderEvent,
    ReaderOp,
    SIMULATOR_READER_ID,
    SimulatedReader,
    SimulatedReaderHandle,
};

// Re-export all types
pub use types::*;
