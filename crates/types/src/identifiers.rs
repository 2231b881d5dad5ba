//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Worker index within the distributed build job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct WorkerId(pub u32);

impl WorkerId {
    /// Index into per-worker tables.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Worker({})", self.0)
    }
}

/// Logical network partition identifier.
///
/// Parts are assigned round-robin to workers; the external partitioner
/// assigns one part per vertex to balance downstream simulation load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionId(pub u32);

impl PartitionId {
    /// Index into per-part tables.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Part({})", self.0)
    }
}

/// Model identifier.
///
/// Id 0 is the reserved "none" sentinel: no model for a vertex, no carried
/// state for an adjacency stub. Concrete models are numbered from 1 in
/// catalog declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(pub u32);

impl ModelId {
    /// The reserved "none" sentinel.
    pub const NONE: Self = ModelId(0);

    /// Index into per-model tables (1-based; the sentinel maps to 0).
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Whether this is the "none" sentinel.
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "Model(none)")
        } else {
            write!(f, "Model({})", self.0)
        }
    }
}

// Required because `thiserror` treats the field named `source` in
// `ModelValidationError::DuplicateEdgeTemplate` as the error source.
impl std::error::Error for ModelId {}

/// Global vertex identifier.
///
/// During construction this is a build-time id (`dist[w]` + local index);
/// after renumbering it is the final contiguous id in worker-rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalVertexId(pub u64);

impl fmt::Display for GlobalVertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vertex({})", self.0)
    }
}

/// Integer timing value in fixed-point milliseconds.
///
/// Real-valued samples are scaled by [`TICKS_PER_MS`] and truncated, giving
/// 2^-16 ms resolution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Tick(pub i64);

/// Ticks per millisecond (2^16).
pub const TICKS_PER_MS: f64 = 65536.0;

impl Tick {
    /// Scale a real-valued millisecond sample into ticks.
    pub fn from_ms(ms: f64) -> Self {
        Tick((TICKS_PER_MS * ms) as i64)
    }

    /// Back to milliseconds.
    pub fn as_ms(&self) -> f64 {
        self.0 as f64 / TICKS_PER_MS
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
