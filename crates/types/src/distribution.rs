//! Size distributions across workers and parts.

use crate::{GlobalVertexId, PartitionId, WorkerId};
use serde::{Deserialize, Serialize};

/// Prefix-sum table of vertex counts per worker.
///
/// `dist[0] = 0`, `dist[w + 1] - dist[w]` is the count owned by worker w,
/// and `dist[P]` is the global total. Counts are recorded in worker order
/// as a phase's cursor walks the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardDistribution {
    dist: Vec<u64>,
}

impl ShardDistribution {
    /// All-zero table for a job of `workers` workers.
    pub fn empty(workers: u32) -> Self {
        Self {
            dist: vec![0; workers as usize + 1],
        }
    }

    /// Build directly from per-worker counts.
    pub fn from_counts(counts: &[u64]) -> Self {
        let mut dist = Vec::with_capacity(counts.len() + 1);
        dist.push(0);
        let mut total = 0;
        for &count in counts {
            total += count;
            dist.push(total);
        }
        Self { dist }
    }

    /// Record worker w's count. Prior workers must already be recorded.
    pub fn record(&mut self, worker: WorkerId, count: u64) {
        let w = worker.index();
        self.dist[w + 1] = self.dist[w] + count;
    }

    /// First global id owned by worker w.
    pub fn offset(&self, worker: WorkerId) -> u64 {
        self.dist[worker.index()]
    }

    /// Count owned by worker w.
    pub fn count(&self, worker: WorkerId) -> u64 {
        self.dist[worker.index() + 1] - self.dist[worker.index()]
    }

    /// Global total.
    pub fn total(&self) -> u64 {
        *self.dist.last().unwrap_or(&0)
    }

    /// Global id of worker w's `local`-th vertex.
    pub fn global_id(&self, worker: WorkerId, local: usize) -> GlobalVertexId {
        GlobalVertexId(self.offset(worker) + local as u64)
    }

    /// Owner of a global id, by prefix search.
    pub fn owner_of(&self, id: GlobalVertexId) -> Option<WorkerId> {
        if id.0 >= self.total() {
            return None;
        }
        let w = match self.dist.binary_search(&id.0) {
            // Ids on a boundary belong to the first worker with that offset
            // and a nonzero count.
            Ok(mut i) => {
                while self.dist[i + 1] == self.dist[i] {
                    i += 1;
                }
                i
            }
            Err(i) => i - 1,
        };
        Some(WorkerId(w as u32))
    }

    /// Whether the table is monotonically non-decreasing.
    pub fn is_monotone(&self) -> bool {
        self.dist.windows(2).all(|w| w[0] <= w[1])
    }

    /// Raw prefix table, length P + 1.
    pub fn as_slice(&self) -> &[u64] {
        &self.dist
    }
}

/// Sizes of one network part: vertex, edge, state, and tick counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRow {
    pub part: PartitionId,
    pub vertices: u64,
    pub edges: u64,
    pub states: u64,
    pub ticks: u64,
}

/// The distribution descriptor produced at the end of a run.
///
/// Consumed at the start of a rebuild to re-split the network
/// deterministically across a possibly different worker count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDistribution {
    rows: Vec<PartRow>,
}

impl NetworkDistribution {
    /// Collect per-part rows (from all workers) into part order.
    pub fn from_rows(mut rows: Vec<PartRow>) -> Self {
        rows.sort_by_key(|r| r.part);
        Self { rows }
    }

    /// Rows in part order.
    pub fn rows(&self) -> &[PartRow] {
        &self.rows
    }

    /// Number of parts.
    pub fn part_count(&self) -> usize {
        self.rows.len()
    }

    /// Cumulative rows: entry i holds the totals of parts `0..i`, with a
    /// leading all-zero row, so entry `part_count()` is the global total.
    pub fn cumulative(&self) -> Vec<PartRow> {
        let mut out = Vec::with_capacity(self.rows.len() + 1);
        let mut acc = PartRow {
            part: PartitionId(0),
            vertices: 0,
            edges: 0,
            states: 0,
            ticks: 0,
        };
        out.push(acc);
        for row in &self.rows {
            acc.part = row.part;
            acc.vertices += row.vertices;
            acc.edges += row.edges;
            acc.states += row.states;
            acc.ticks += row.ticks;
            out.push(acc);
        }
        out
    }

    /// Cumulative (vertex, edge) totals per worker for the given part
    /// spans, with a leading (0, 0) row. `spans` is the (first, count)
    /// part range of each worker under the new split.
    pub fn worker_prefix(&self, spans: &[(u32, u32)]) -> Vec<(u64, u64)> {
        let mut out = Vec::with_capacity(spans.len() + 1);
        let (mut vertices, mut edges) = (0u64, 0u64);
        out.push((0, 0));
        for &(first, count) in spans {
            for k in 0..count {
                let row = &self.rows[(first + k) as usize];
                vertices += row.vertices;
                edges += row.edges;
            }
            out.push((vertices, edges));
        }
        out
    }
}
