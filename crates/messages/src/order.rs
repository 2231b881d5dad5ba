//! Renumbering messages.

use neurograph_types::{GlobalVertexId, WorkerId};
use serde::{Deserialize, Serialize};

/// One relabeling: a build-time global id and its rank within the sender's
/// final vertex order. Receivers add the sender's prefix offset to the rank
/// to obtain the final global id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenumberEntry {
    pub old: GlobalVertexId,
    pub rank: u64,
}

/// The old → new map one worker broadcasts when the relay cursor reaches
/// it. Entries are in final-rank order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenumberMap {
    pub from: WorkerId,
    pub entries: Vec<RenumberEntry>,
}

impl RenumberMap {
    /// Number of vertices relabeled by this map.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the sender owns no vertices.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
