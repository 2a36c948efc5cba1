/*
[INPUT]:  Terminal SDK contract and simulator scripting
[OUTPUT]: ReaderCapability trait, reader events, simulated reader
[POS]:    Reader layer - card-present terminal abstraction
[UPDATE]: When adding reader primitives or new reader implementations
*/

pub mod capability;
pub mod simulated;

pub use capability::{ReaderCapability, ReaderEvent};
pub use simulated::{
    ReaderCall, ReaderOp, SIMULATOR_READER_ID, SimulatedReader, SimulatedReaderHandle,
};
