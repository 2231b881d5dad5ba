//! Inbound events for worker state machines.

use neurograph_messages::{
    AdjacencyBatch, ConnRequest, NeighborBatch, PartitionBatch, RenumberMap, WireMessage,
};
use neurograph_types::PartitionAssignment;

/// Everything a worker reacts to: phase starts issued by the runner and
/// messages delivered from other workers.
#[derive(Debug, Clone)]
pub enum Event {
    /// Begin the connection-resolution walk. The shard is already built.
    ConnectStart,

    /// A pull request from another worker.
    ConnRequestReceived(ConnRequest),

    /// Vertex data from the worker the cursor is waiting on.
    NeighborBatchReceived(NeighborBatch),

    /// Cached adjacency from the worker the cursor is waiting on.
    AdjacencyBatchReceived(AdjacencyBatch),

    /// Begin redistribution with the externally computed assignment.
    RedistributeStart { assignment: PartitionAssignment },

    /// Vertex records for a locally owned part.
    PartitionBatchReceived(PartitionBatch),

    /// Begin the renumbering relay.
    RenumberStart,

    /// An old → new id map from some worker.
    RenumberMapReceived(RenumberMap),
}

impl Event {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::ConnectStart => "ConnectStart",
            Event::ConnRequestReceived(_) => "ConnRequestReceived",
            Event::NeighborBatchReceived(_) => "NeighborBatchReceived",
            Event::AdjacencyBatchReceived(_) => "AdjacencyBatchReceived",
            Event::RedistributeStart { .. } => "RedistributeStart",
            Event::PartitionBatchReceived(_) => "PartitionBatchReceived",
            Event::RenumberStart => "RenumberStart",
            Event::RenumberMapReceived(_) => "RenumberMapReceived",
        }
    }

    /// Lift a decoded wire message into the matching event.
    pub fn from_wire(message: WireMessage) -> Event {
        match message {
            WireMessage::ConnRequest(m) => Event::ConnRequestReceived(m),
            WireMessage::NeighborBatch(m) => Event::NeighborBatchReceived(m),
            WireMessage::AdjacencyBatch(m) => Event::AdjacencyBatchReceived(m),
            WireMessage::PartitionBatch(m) => Event::PartitionBatchReceived(m),
            WireMessage::RenumberMap(m) => Event::RenumberMapReceived(m),
        }
    }
}
