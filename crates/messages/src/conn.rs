//! Connection-resolution messages.
//!
//! The resolver walk exchanges three records: a pull request, the vertex
//! data of a worker that has not been resolved against yet, and the cached
//! adjacency a lower-indexed worker built on behalf of the requester.

use neurograph_types::{ModelId, Position, WorkerId};
use serde::{Deserialize, Serialize};

/// Pull request: `from` asks the receiver for the data needed to resolve
/// against it: vertex data when the receiver has the higher index, the
/// cached adjacency when it has the lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnRequest {
    pub from: WorkerId,
}

/// Vertex data of a worker the requester still has to resolve against:
/// one model and position per vertex, in local order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborBatch {
    pub from: WorkerId,
    pub models: Vec<ModelId>,
    pub positions: Vec<Position>,
}

impl NeighborBatch {
    /// Number of vertices described.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the sender owns no vertices.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether the parallel vectors agree on the vertex count.
    pub fn is_consistent(&self) -> bool {
        self.models.len() == self.positions.len()
    }
}

/// One cached forward-test result: the requester-local index of the target
/// vertex and the edge model (`NONE` marks a bookkeeping stub).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEdge {
    pub target: u64,
    pub model: ModelId,
}

/// The adjacency rows a lower-indexed worker cached for the requester:
/// one row per sender vertex, plus the sender's positions so that edge
/// state can be built from endpoint distances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjacencyBatch {
    pub from: WorkerId,
    pub positions: Vec<Position>,
    pub rows: Vec<Vec<CachedEdge>>,
}

impl AdjacencyBatch {
    /// Number of sender vertices described.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the sender owns no vertices.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether rows and positions agree on the vertex count.
    pub fn is_consistent(&self) -> bool {
        self.rows.len() == self.positions.len()
    }

    /// Total cached entries across all rows.
    pub fn entry_count(&self) -> usize {
        self.rows.iter().map(|r| r.len()).sum()
    }
}
