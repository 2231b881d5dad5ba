//! The worker state machine.
//!
//! Composes the phase machines (connection resolution, redistribution,
//! renumbering) behind one event handler. The shard is built at
//! construction time from the worker's seeded stream; the runner then
//! drives the phases through their barriers.

use neurograph_builder::ShardBuilder;
use neurograph_connect::ConnectionResolver;
use neurograph_core::{
    Action, BuildConfig, ConfigError, Event, ProtocolError, StateMachine, StaticTopology, Topology,
};
use neurograph_partition::PartitionRedistributor;
use neurograph_renumber::GlobalRenumberer;
use neurograph_types::{
    CsrFragment, GenerationError, GraphSpec, ModelCatalog, PartRow, Shard, ShardDistribution,
    VertexExport, WorkerId,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors surfaced while constructing a worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// One worker of the distributed build job.
#[derive(Debug)]
pub struct WorkerStateMachine {
    topology: StaticTopology,
    catalog: Arc<ModelCatalog>,
    rng: ChaCha8Rng,
    shard: Shard,
    /// Build-time distribution after connect; final distribution after
    /// renumbering.
    dist: ShardDistribution,
    resolver: ConnectionResolver,
    redistributor: Option<PartitionRedistributor>,
    renumberer: Option<GlobalRenumberer>,
    renumbered: bool,
}

impl WorkerStateMachine {
    /// Build this worker's shard and prepare the phase machines.
    pub fn new(
        local: WorkerId,
        config: &BuildConfig,
        catalog: Arc<ModelCatalog>,
        graph: &GraphSpec,
    ) -> Result<Self, WorkerError> {
        let topology = StaticTopology::new(local, config)?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed_for(local.0));
        let shard = ShardBuilder::new(&topology, &catalog, graph).build(&mut rng)?;
        info!(
            worker = local.0,
            workers = config.workers,
            vertices = shard.len(),
            "worker initialized"
        );
        Ok(Self {
            topology,
            catalog,
            rng,
            shard,
            dist: ShardDistribution::empty(config.workers),
            resolver: ConnectionResolver::new(local, config.workers),
            redistributor: None,
            renumberer: None,
            renumbered: false,
        })
    }

    /// This worker's id.
    pub fn local_worker(&self) -> WorkerId {
        self.topology.local_worker()
    }

    /// The current shard.
    pub fn shard(&self) -> &Shard {
        &self.shard
    }

    /// The current vertex distribution.
    pub fn dist(&self) -> &ShardDistribution {
        &self.dist
    }

    /// CSR view of the shard for the external partitioner.
    pub fn csr_fragment(&self) -> CsrFragment {
        self.shard.to_csr(&self.dist)
    }

    /// Writer-boundary records in local (final, once renumbered) order.
    pub fn export(&self) -> Vec<VertexExport> {
        self.shard.export(&self.catalog)
    }

    /// Per-part size rows for the distribution descriptor.
    pub fn part_rows(&self) -> Vec<PartRow> {
        let (first, _) = self.topology.local_parts();
        self.shard.part_rows(first)
    }

    fn out_of_phase(&self, event: &'static str) -> ProtocolError {
        ProtocolError::OutOfPhase {
            worker: self.local_worker(),
            event,
        }
    }

    fn sync_dist(&mut self) {
        if self.resolver.is_complete() {
            self.dist = self.resolver.dist().clone();
        }
    }
}

impl StateMachine for WorkerStateMachine {
    fn handle(&mut self, event: Event) -> Result<Vec<Action>, ProtocolError> {
        match event {
            Event::ConnectStart => {
                let actions =
                    self.resolver
                        .start(&mut self.shard, &self.catalog, &mut self.rng)?;
                self.sync_dist();
                Ok(actions)
            }
            Event::ConnRequestReceived(request) => self.resolver.on_request(request, &self.shard),
            Event::NeighborBatchReceived(batch) => {
                let actions = self.resolver.on_neighbors(
                    batch,
                    &mut self.shard,
                    &self.catalog,
                    &mut self.rng,
                )?;
                self.sync_dist();
                Ok(actions)
            }
            Event::AdjacencyBatchReceived(batch) => {
                let actions = self.resolver.on_adjacency(
                    batch,
                    &mut self.shard,
                    &self.catalog,
                    &mut self.rng,
                )?;
                self.sync_dist();
                Ok(actions)
            }
            Event::RedistributeStart { assignment } => {
                if !self.resolver.is_complete()
                    || self.redistributor.is_some()
                    || self.renumberer.is_some()
                    || self.renumbered
                {
                    return Err(self.out_of_phase("RedistributeStart"));
                }
                let mut redistributor = PartitionRedistributor::new(&self.topology);
                let actions =
                    redistributor.scatter(&self.topology, &self.shard, &self.dist, &assignment)?;
                self.redistributor = Some(redistributor);
                Ok(actions)
            }
            Event::PartitionBatchReceived(batch) => match self.redistributor.as_mut() {
                Some(redistributor) => redistributor.on_batch(batch),
                None => Err(self.out_of_phase("PartitionBatchReceived")),
            },
            Event::RenumberStart => {
                let redistributor = match self.redistributor.take() {
                    Some(r) if r.is_complete() => r,
                    _ => return Err(self.out_of_phase("RenumberStart")),
                };
                let mut renumberer =
                    GlobalRenumberer::new(&self.topology, redistributor.into_parts());
                let actions = renumberer.start()?;
                self.renumberer = Some(renumberer);
                Ok(actions)
            }
            Event::RenumberMapReceived(map) => {
                let Some(renumberer) = self.renumberer.as_mut() else {
                    return Err(self.out_of_phase("RenumberMapReceived"));
                };
                let actions = renumberer.on_map(map)?;
                if self.renumberer.as_ref().is_some_and(|r| r.is_complete()) {
                    if let Some(renumberer) = self.renumberer.take() {
                        let (shard, dist) = renumberer.into_shard();
                        self.shard = shard;
                        self.dist = dist;
                        self.renumbered = true;
                    }
                }
                Ok(actions)
            }
        }
    }
}
