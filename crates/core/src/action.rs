//! Outbound actions returned by worker state machines.

use neurograph_messages::WireMessage;
use neurograph_types::WorkerId;
use std::fmt;

/// Construction phases separated by global barriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Connect,
    Partition,
    Renumber,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Connect => write!(f, "connect"),
            Phase::Partition => write!(f, "partition"),
            Phase::Renumber => write!(f, "renumber"),
        }
    }
}

/// Effects a state machine asks the runner to perform.
///
/// State machines do no I/O themselves; the runner owns delivery and the
/// phase barriers.
#[derive(Debug, Clone)]
pub enum Action {
    /// Point-to-point send.
    Send {
        to: WorkerId,
        message: WireMessage,
    },

    /// Deliver to every worker, the sender included.
    Broadcast { message: WireMessage },

    /// This worker reached the end-of-phase barrier.
    PhaseComplete(Phase),
}

impl Action {
    /// Get a human-readable name for this action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Send { .. } => "Send",
            Action::Broadcast { .. } => "Broadcast",
            Action::PhaseComplete(_) => "PhaseComplete",
        }
    }
}
