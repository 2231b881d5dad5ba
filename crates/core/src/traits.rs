//! Core traits for state machines.

use crate::{Action, Event, ProtocolError};

/// A state machine that processes events.
///
/// All construction logic is implemented as per-worker state machines that
/// are:
///
/// - **Synchronous**: no async, no blocking
/// - **Deterministic**: same state + event = same actions
/// - **Pure-ish**: mutates self, but performs no I/O
///
/// The runner executes the returned actions: sending messages, delivering
/// broadcasts, and releasing phase barriers. A protocol-invariant violation
/// is fatal and aborts the whole job.
pub trait StateMachine {
    /// Process an event, returning actions to perform.
    fn handle(&mut self, event: Event) -> Result<Vec<Action>, ProtocolError>;
}
