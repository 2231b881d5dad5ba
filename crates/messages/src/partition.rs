//! Redistribution messages.

use neurograph_types::{
    AdjacencyEntry, DeferredEvent, GlobalVertexId, ModelId, PartitionId, Position, Tick, WorkerId,
};
use serde::{Deserialize, Serialize};

/// The full record of one vertex in flight to its new owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexRecord {
    /// Build-time global id, the renumbering key.
    pub original_id: GlobalVertexId,
    pub model: ModelId,
    pub position: Position,
    pub state: Vec<f64>,
    pub ticks: Vec<Tick>,
    /// Adjacency with build-time peer ids.
    pub adjacency: Vec<AdjacencyEntry>,
    pub events: Vec<DeferredEvent>,
}

/// All of one worker's vertices destined for one part.
///
/// A batch is sent for every (source worker, part) pair, empty or not:
/// the receiver's fan-in barrier counts messages, not records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionBatch {
    pub from: WorkerId,
    pub part: PartitionId,
    pub records: Vec<VertexRecord>,
}

impl PartitionBatch {
    /// Number of vertex records carried.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch carries no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
