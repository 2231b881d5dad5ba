//! Deterministic in-process runner for the construction pipeline.
//!
//! Given the same configuration and seed, a run produces identical
//! results every time: workers are synchronous state machines, delivery
//! is FIFO, and every cross-worker byte goes through the wire codec.

mod runner;

pub use runner::{block_partition, BuildReport, SimulationError, SimulationRunner};
