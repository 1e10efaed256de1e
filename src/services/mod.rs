//! Long-running services built on top of the configuration model.

pub mod batch;

pub use batch::{BatchItem, BatchRunner, RunOutcome, RunSignal};
