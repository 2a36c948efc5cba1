/*
[INPUT]:  HTTP client configuration and backend endpoints
[OUTPUT]: HTTP responses and typed backend results
[POS]:    HTTP layer - payments backend communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod backend;
pub mod client;
pub mod error;
pub mod payments;
pub mod terminal;

pub use backend::PaymentsBackend;
pub use error::{Result, TerminalError};

pub use client::{ClientConfig, DEFAULT_BACKEND_URL, TerminalBackendClient};
