//! Partitioner boundary types.
//!
//! The core hands the external partitioner a CSR view of each worker's
//! shard and receives back one partition id per local vertex. File formats
//! and the partitioner invocation itself live outside this workspace.

use crate::{PartitionId, Position};
use serde::{Deserialize, Serialize};

/// One worker's CSR fragment of the global adjacency structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrFragment {
    /// Global vertex distribution, length P + 1.
    pub vtxdist: Vec<u64>,
    /// Adjacency prefix array, length local count + 1.
    pub xadj: Vec<u64>,
    /// Flat peer list (build-time global ids).
    pub adjcy: Vec<u64>,
    /// Local vertex coordinates.
    pub coords: Vec<Position>,
    /// Uniform vertex weights.
    pub vwgt: Vec<u64>,
}

impl CsrFragment {
    /// Number of local vertices described.
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Whether the fragment is empty.
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

/// Externally computed partition assignment: one part per local vertex,
/// in build-time local order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionAssignment {
    parts: Vec<PartitionId>,
}

impl PartitionAssignment {
    /// Wrap a per-vertex part list.
    pub fn new(parts: Vec<PartitionId>) -> Self {
        Self { parts }
    }

    /// Number of assigned vertices.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether no vertices are assigned.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Part of the `local`-th vertex.
    pub fn part(&self, local: usize) -> PartitionId {
        self.parts[local]
    }

    /// Iterate over (local index, part).
    pub fn iter(&self) -> impl Iterator<Item = (usize, PartitionId)> + '_ {
        self.parts.iter().copied().enumerate()
    }

    /// Whether every assigned part is inside `0..total_parts`.
    pub fn within(&self, total_parts: u32) -> bool {
        self.parts.iter().all(|p| p.0 < total_parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_bounds() {
        let assignment =
            PartitionAssignment::new(vec![PartitionId(0), PartitionId(3), PartitionId(1)]);
        assert_eq!(assignment.len(), 3);
        assert_eq!(assignment.part(1), PartitionId(3));
        assert!(assignment.within(4));
        assert!(!assignment.within(3));
    }
}
