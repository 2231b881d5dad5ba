//! Combined worker state machine.
//!
//! This crate composes the builder, resolver, redistributor, and
//! renumberer into a complete construction worker.

mod state;

pub use state::{WorkerError, WorkerStateMachine};
