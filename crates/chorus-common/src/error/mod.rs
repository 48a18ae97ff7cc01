//! Shared error classification

mod fault;

pub use fault::FaultKind;
