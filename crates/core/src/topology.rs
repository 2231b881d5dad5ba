//! Topology trait and static implementation.
//!
//! Topology answers who is who in the job: how many workers cooperate,
//! which logical parts each owns, and who owns a given part. Parts are
//! split evenly with the remainder going to the lowest-indexed workers,
//! and the same split is reused for partition ownership during
//! redistribution.

use crate::{BuildConfig, ConfigError};
use neurograph_types::{PartitionId, WorkerId};

/// Unified topology view for every construction phase.
pub trait Topology: Send + Sync {
    /// Get the local worker's id.
    fn local_worker(&self) -> WorkerId;

    /// Get the total number of workers (P).
    fn worker_count(&self) -> u32;

    /// Get the total number of logical parts.
    fn total_parts(&self) -> u32;

    // Derived methods

    /// The (first part, part count) span owned by a worker.
    fn parts_for(&self, worker: WorkerId) -> (PartitionId, u32) {
        let div = self.total_parts() / self.worker_count();
        let rem = self.total_parts() % self.worker_count();
        let w = worker.0;
        let count = div + u32::from(w < rem);
        let first = w * div + w.min(rem);
        (PartitionId(first), count)
    }

    /// The part span owned by the local worker.
    fn local_parts(&self) -> (PartitionId, u32) {
        self.parts_for(self.local_worker())
    }

    /// The worker owning a part.
    fn owner_of_part(&self, part: PartitionId) -> WorkerId {
        let div = self.total_parts() / self.worker_count();
        let rem = self.total_parts() % self.worker_count();
        let p = part.0;
        // The first `rem` workers own div + 1 parts each.
        let boundary = rem * (div + 1);
        if p < boundary {
            WorkerId(p / (div + 1))
        } else {
            WorkerId(rem + (p - boundary) / div)
        }
    }

    /// Whether the local worker owns a part.
    fn owns_part(&self, part: PartitionId) -> bool {
        self.owner_of_part(part) == self.local_worker()
    }

    /// Part spans of every worker, in worker order.
    fn part_spans(&self) -> Vec<(u32, u32)> {
        (0..self.worker_count())
            .map(|w| {
                let (first, count) = self.parts_for(WorkerId(w));
                (first.0, count)
            })
            .collect()
    }
}

/// A static topology implementation.
#[derive(Debug, Clone, Copy)]
pub struct StaticTopology {
    local_worker: WorkerId,
    workers: u32,
    total_parts: u32,
}

impl StaticTopology {
    /// Create the topology of one worker from the job configuration.
    pub fn new(local_worker: WorkerId, config: &BuildConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            local_worker,
            workers: config.workers,
            total_parts: config.total_parts,
        })
    }
}

impl Topology for StaticTopology {
    fn local_worker(&self) -> WorkerId {
        self.local_worker
    }

    fn worker_count(&self) -> u32 {
        self.workers
    }

    fn total_parts(&self) -> u32 {
        self.total_parts
    }
}
