//! Deterministic simulation runner.
//!
//! Drives P worker state machines through the three phase barriers,
//! delivering their messages in FIFO order. Every message crosses the
//! wire codec (encoded on send, decoded on delivery) exactly as a real
//! transport would carry it. Given the same configuration and seed, a run
//! produces identical output every time.

use neurograph_core::{Action, BuildConfig, Event, Phase, ProtocolError, StateMachine};
use neurograph_messages::{decode_message, encode_message, CodecError};
use neurograph_node::{WorkerError, WorkerStateMachine};
use neurograph_types::{
    CsrFragment, EdgeTemplate, GraphSpec, Model, ModelCatalog, ModelValidationError,
    NetworkDistribution, PartitionAssignment, PartitionId, ShardDistribution, VertexExport,
    WorkerId,
};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors that abort a simulated build.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Validation(#[from] ModelValidationError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("{worker} reached the {completed} barrier during the {phase} phase")]
    BarrierMismatch {
        worker: WorkerId,
        completed: Phase,
        phase: Phase,
    },

    #[error("{worker} reached the {phase} barrier twice")]
    DuplicateBarrier { worker: WorkerId, phase: Phase },

    #[error("no messages in flight but the {phase} barrier is incomplete")]
    Stalled { phase: Phase },
}

/// A framed message in flight.
#[derive(Debug)]
struct Envelope {
    to: WorkerId,
    bytes: Vec<u8>,
}

/// The final output of one simulated build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Final vertex distribution across workers.
    pub dist: ShardDistribution,
    /// Distribution descriptor (per-part sizes, in part order).
    pub network: NetworkDistribution,
    /// Writer-boundary records per worker, in final global-id order.
    pub exports: Vec<Vec<VertexExport>>,
}

impl BuildReport {
    /// Total vertices across all workers.
    pub fn total_vertices(&self) -> u64 {
        self.dist.total()
    }

    /// Flattened exports in final global-id order.
    pub fn all_vertices(&self) -> impl Iterator<Item = &VertexExport> {
        self.exports.iter().flatten()
    }
}

/// In-process runner for a P-worker construction job.
#[derive(Debug)]
pub struct SimulationRunner {
    catalog: Arc<ModelCatalog>,
    workers: Vec<WorkerStateMachine>,
    queue: VecDeque<Envelope>,
    completed: Vec<bool>,
    phase: Phase,
}

impl SimulationRunner {
    /// Validate the catalog and build every worker's shard.
    pub fn new(
        config: BuildConfig,
        models: Vec<Model>,
        templates: Vec<EdgeTemplate>,
        graph: &GraphSpec,
    ) -> Result<Self, SimulationError> {
        config.validate().map_err(WorkerError::from)?;
        let catalog = Arc::new(ModelCatalog::new(models, templates)?);
        let workers = (0..config.workers)
            .map(|w| WorkerStateMachine::new(WorkerId(w), &config, catalog.clone(), graph))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            catalog,
            workers,
            queue: VecDeque::new(),
            completed: Vec::new(),
            phase: Phase::Connect,
        })
    }

    /// The shared catalog.
    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Number of workers in the job.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Run the full pipeline. `partition` is the external partitioner
    /// boundary: it receives each worker's CSR fragment and returns one
    /// part per local vertex.
    pub fn run<F>(&mut self, mut partition: F) -> Result<BuildReport, SimulationError>
    where
        F: FnMut(WorkerId, &CsrFragment) -> PartitionAssignment,
    {
        info!(workers = self.workers.len(), "building network");
        let starts = vec![Event::ConnectStart; self.workers.len()];
        self.run_phase(Phase::Connect, starts)?;

        info!("partitioning network");
        let starts: Vec<Event> = self
            .workers
            .iter()
            .map(|worker| Event::RedistributeStart {
                assignment: partition(worker.local_worker(), &worker.csr_fragment()),
            })
            .collect();
        self.run_phase(Phase::Partition, starts)?;

        info!("reordering network");
        let starts = vec![Event::RenumberStart; self.workers.len()];
        self.run_phase(Phase::Renumber, starts)?;

        info!("writing network");
        let rows = self
            .workers
            .iter()
            .flat_map(|worker| worker.part_rows())
            .collect();
        Ok(BuildReport {
            dist: self.workers[0].dist().clone(),
            network: NetworkDistribution::from_rows(rows),
            exports: self.workers.iter().map(|worker| worker.export()).collect(),
        })
    }

    /// Start one phase on every worker and pump messages until the
    /// barrier releases.
    fn run_phase(&mut self, phase: Phase, starts: Vec<Event>) -> Result<(), SimulationError> {
        self.phase = phase;
        self.completed = vec![false; self.workers.len()];
        for (w, event) in starts.into_iter().enumerate() {
            let actions = self.workers[w].handle(event)?;
            self.dispatch(WorkerId(w as u32), actions)?;
        }
        self.pump()?;
        if !self.completed.iter().all(|&done| done) {
            return Err(SimulationError::Stalled { phase });
        }
        Ok(())
    }

    /// Deliver queued messages until none are in flight.
    fn pump(&mut self) -> Result<(), SimulationError> {
        while let Some(envelope) = self.queue.pop_front() {
            let message = decode_message(&envelope.bytes)?;
            let event = Event::from_wire(message);
            let actions = self.workers[envelope.to.index()].handle(event)?;
            self.dispatch(envelope.to, actions)?;
        }
        Ok(())
    }

    /// Execute one worker's actions: frame sends, fan out broadcasts, and
    /// track barrier completions.
    fn dispatch(&mut self, from: WorkerId, actions: Vec<Action>) -> Result<(), SimulationError> {
        for action in actions {
            match action {
                Action::Send { to, message } => {
                    let bytes = encode_message(&message)?;
                    self.queue.push_back(Envelope { to, bytes });
                }
                Action::Broadcast { message } => {
                    let bytes = encode_message(&message)?;
                    for w in 0..self.workers.len() {
                        self.queue.push_back(Envelope {
                            to: WorkerId(w as u32),
                            bytes: bytes.clone(),
                        });
                    }
                }
                Action::PhaseComplete(completed) => {
                    if completed != self.phase {
                        return Err(SimulationError::BarrierMismatch {
                            worker: from,
                            completed,
                            phase: self.phase,
                        });
                    }
                    if self.completed[from.index()] {
                        return Err(SimulationError::DuplicateBarrier {
                            worker: from,
                            phase: self.phase,
                        });
                    }
                    self.completed[from.index()] = true;
                }
            }
        }
        Ok(())
    }
}

/// Contiguous block partitioning: build-time id g goes to part
/// `g * total_parts / total`. A deterministic stand-in for the external
/// geometric partitioner.
pub fn block_partition(
    worker: WorkerId,
    fragment: &CsrFragment,
    total_parts: u32,
) -> PartitionAssignment {
    let offset = fragment.vtxdist[worker.index()];
    let total = *fragment.vtxdist.last().unwrap_or(&0);
    let parts = (0..fragment.len() as u64)
        .map(|i| {
            let part = if total == 0 {
                0
            } else {
                ((offset + i) * total_parts as u64 / total).min(total_parts as u64 - 1)
            };
            PartitionId(part as u32)
        })
        .collect();
    PartitionAssignment::new(parts)
}
