//! Fatal error taxonomy for the construction protocol.

use crate::Phase;
use neurograph_types::{GenerationError, GlobalVertexId, PartitionId, WorkerId};
use thiserror::Error;

/// Configuration problems surfaced before any phase starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("total parts ({parts}) must be at least the worker count ({workers})")]
    TooFewParts { parts: u32, workers: u32 },
}

/// Protocol-invariant violations. All fatal: the run aborts with a
/// diagnostic identifying the offending worker and phase.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("worker {worker}: {phase} message from {from} declares {declared} entries but carries {actual}")]
    SizeMismatch {
        worker: WorkerId,
        phase: Phase,
        from: WorkerId,
        declared: u64,
        actual: u64,
    },

    #[error("worker {worker}: unexpected {message} from {from} while resolving worker {cursor}")]
    UnexpectedSender {
        worker: WorkerId,
        from: WorkerId,
        message: &'static str,
        cursor: u32,
    },

    #[error("worker {worker}: {event} does not belong to the current phase")]
    OutOfPhase {
        worker: WorkerId,
        event: &'static str,
    },

    #[error("worker {worker}: cached row from {from} targets local vertex {target} of {len}")]
    CacheTargetOutOfRange {
        worker: WorkerId,
        from: WorkerId,
        target: u64,
        len: u64,
    },

    #[error("worker {worker}: partition assignment covers {got} vertices, shard owns {expected}")]
    AssignmentSizeMismatch {
        worker: WorkerId,
        got: u64,
        expected: u64,
    },

    #[error("worker {worker}: partition assignment names {part}, outside the {total_parts} configured parts")]
    PartOutOfRange {
        worker: WorkerId,
        part: PartitionId,
        total_parts: u32,
    },

    #[error("worker {worker}: {part} from {from} is not owned locally")]
    PartNotOwned {
        worker: WorkerId,
        from: WorkerId,
        part: PartitionId,
    },

    #[error("worker {worker}: deferred event on vertex {vertex} references dangling adjacency slot {slot}")]
    DanglingEventSlot {
        worker: WorkerId,
        vertex: GlobalVertexId,
        slot: u64,
    },

    #[error(transparent)]
    Generation(#[from] GenerationError),
}
