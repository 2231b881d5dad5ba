//! Scatter/gather redistribution of vertices to their partition owners.
//!
//! Given the externally computed partition assignment, every worker
//! packages each local vertex's full record into one batch per global
//! part and sends it to the part's owner. A batch is sent for every
//! (worker, part) pair, empty or not, so the receiver can treat
//! `workers × parts_owned` received batches as its fan-in barrier.

use neurograph_core::{Action, Phase, ProtocolError, Topology};
use neurograph_messages::{PartitionBatch, VertexRecord, WireMessage};
use neurograph_types::{
    GlobalVertexId, PartitionAssignment, PartitionId, Shard, ShardDistribution, WorkerId,
};
use tracing::{debug, info};

/// Per-worker context of the redistribution phase.
#[derive(Debug)]
pub struct PartitionRedistributor {
    local: WorkerId,
    total_parts: u32,
    first_part: PartitionId,
    /// Inbound batches still outstanding (`workers × parts_owned` total).
    expected: u64,
    received: u64,
    /// Records accumulated per locally owned part.
    gathered: Vec<Vec<VertexRecord>>,
    scattered: bool,
    complete: bool,
}

impl PartitionRedistributor {
    /// Create the redistributor for the local worker.
    pub fn new(topology: &dyn Topology) -> Self {
        let (first_part, owned) = topology.local_parts();
        Self {
            local: topology.local_worker(),
            total_parts: topology.total_parts(),
            first_part,
            expected: topology.worker_count() as u64 * owned as u64,
            received: 0,
            gathered: vec![Vec::new(); owned as usize],
            scattered: false,
            complete: false,
        }
    }

    /// Whether the fan-in barrier has been reached.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Package every local vertex for its destination part's owner.
    pub fn scatter(
        &mut self,
        topology: &dyn Topology,
        shard: &Shard,
        dist: &ShardDistribution,
        assignment: &PartitionAssignment,
    ) -> Result<Vec<Action>, ProtocolError> {
        if self.scattered {
            return Err(ProtocolError::OutOfPhase {
                worker: self.local,
                event: "RedistributeStart",
            });
        }
        if assignment.len() != shard.len() {
            return Err(ProtocolError::AssignmentSizeMismatch {
                worker: self.local,
                got: assignment.len() as u64,
                expected: shard.len() as u64,
            });
        }
        for (_, part) in assignment.iter() {
            if part.0 >= self.total_parts {
                return Err(ProtocolError::PartOutOfRange {
                    worker: self.local,
                    part,
                    total_parts: self.total_parts,
                });
            }
        }

        let offset = dist.offset(self.local);
        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); self.total_parts as usize];
        for (i, part) in assignment.iter() {
            buckets[part.index()].push(i);
        }

        info!(
            worker = self.local.0,
            vertices = shard.len(),
            parts = self.total_parts,
            "scattering vertices to partition owners"
        );

        let mut actions = Vec::with_capacity(buckets.len());
        for (p, bucket) in buckets.iter().enumerate() {
            let part = PartitionId(p as u32);
            let records: Vec<VertexRecord> = bucket
                .iter()
                .map(|&i| {
                    let vertex = &shard.vertices[i];
                    VertexRecord {
                        original_id: GlobalVertexId(offset + i as u64),
                        model: vertex.model,
                        position: vertex.position,
                        state: vertex.state.clone(),
                        ticks: vertex.ticks.clone(),
                        adjacency: vertex.adjacency.clone(),
                        events: vertex.events.clone(),
                    }
                })
                .collect();
            actions.push(Action::Send {
                to: topology.owner_of_part(part),
                message: WireMessage::PartitionBatch(PartitionBatch {
                    from: self.local,
                    part,
                    records,
                }),
            });
        }
        self.scattered = true;
        Ok(actions)
    }

    /// Accumulate an inbound batch for a locally owned part.
    pub fn on_batch(&mut self, batch: PartitionBatch) -> Result<Vec<Action>, ProtocolError> {
        if self.complete {
            return Err(ProtocolError::OutOfPhase {
                worker: self.local,
                event: "PartitionBatchReceived",
            });
        }
        let k = batch.part.0.wrapping_sub(self.first_part.0) as usize;
        if batch.part.0 < self.first_part.0 || k >= self.gathered.len() {
            return Err(ProtocolError::PartNotOwned {
                worker: self.local,
                from: batch.from,
                part: batch.part,
            });
        }
        debug!(
            worker = self.local.0,
            from = batch.from.0,
            part = batch.part.0,
            records = batch.len(),
            "gathered partition batch"
        );

        self.gathered[k].extend(batch.records);
        self.received += 1;
        if self.received < self.expected {
            return Ok(Vec::new());
        }

        // All source workers have reported for every owned part. Sort each
        // part by model with the original id breaking ties, so the result
        // does not depend on arrival order.
        for part in &mut self.gathered {
            part.sort_by_key(|r| (r.model, r.original_id));
        }
        self.complete = true;
        info!(
            worker = self.local.0,
            vertices = self.gathered.iter().map(|p| p.len()).sum::<usize>(),
            "partition gather complete"
        );
        Ok(vec![Action::PhaseComplete(Phase::Partition)])
    }

    /// Consume the gathered parts, in part order.
    pub fn into_parts(self) -> Vec<Vec<VertexRecord>> {
        self.gathered
    }
}
