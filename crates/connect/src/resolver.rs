//! The connection-resolution state machine.
//!
//! Each worker walks a cursor over all worker indices in increasing order,
//! deciding edges between its shard and the cursor worker's:
//!
//! - cursor below the local index ("prev"): that worker already tested the
//!   pairs while walking past us and cached the results keyed by our
//!   index; we pull the cache and build edge state locally.
//! - cursor equals the local index ("self"): every unordered local pair is
//!   tested in both directions.
//! - cursor above the local index ("next"): we test both directions
//!   against the pulled vertex data; forward results are cached for that
//!   worker to pull once its own cursor reaches us.
//!
//! A pull request for a cache that does not exist yet is queued and
//! answered as soon as the cursor builds it.

use crate::{edge_entry, make_connection};
use neurograph_core::{Action, Phase, ProtocolError};
use neurograph_messages::{
    AdjacencyBatch, CachedEdge, ConnRequest, NeighborBatch, WireMessage,
};
use neurograph_types::{
    GlobalVertexId, ModelCatalog, Position, Shard, ShardDistribution, WorkerId,
};
use rand::Rng;
use std::collections::HashMap;
use tracing::{debug, info};

/// Per-worker context of the connection phase.
#[derive(Debug)]
pub struct ConnectionResolver {
    local: WorkerId,
    workers: u32,
    /// Next worker index to resolve against; `workers` once done.
    cursor: u32,
    started: bool,
    complete: bool,
    dist: ShardDistribution,
    /// Forward-test rows cached for higher-indexed workers, keyed by their
    /// index; each cache is pulled exactly once.
    caches: HashMap<WorkerId, Vec<Vec<CachedEdge>>>,
    /// Pull requests waiting for their cache to be built.
    pending: Vec<WorkerId>,
}

impl ConnectionResolver {
    /// Create the resolver for one worker of a P-worker job.
    pub fn new(local: WorkerId, workers: u32) -> Self {
        Self {
            local,
            workers,
            cursor: 0,
            started: false,
            complete: false,
            dist: ShardDistribution::empty(workers),
            caches: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Whether the walk has finished.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Build-time vertex distribution, filled in cursor order.
    pub fn dist(&self) -> &ShardDistribution {
        &self.dist
    }

    /// Begin the walk.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        shard: &mut Shard,
        catalog: &ModelCatalog,
        rng: &mut R,
    ) -> Result<Vec<Action>, ProtocolError> {
        if self.started {
            return Err(ProtocolError::OutOfPhase {
                worker: self.local,
                event: "ConnectStart",
            });
        }
        self.started = true;
        self.advance(shard, catalog, rng)
    }

    /// A pull request from another worker.
    pub fn on_request(
        &mut self,
        request: ConnRequest,
        shard: &Shard,
    ) -> Result<Vec<Action>, ProtocolError> {
        let from = request.from;
        if from == self.local || from.0 >= self.workers {
            return Err(ProtocolError::UnexpectedSender {
                worker: self.local,
                from,
                message: "ConnRequest",
                cursor: self.cursor,
            });
        }
        if from < self.local {
            // An earlier worker resolves against us with our vertex data.
            Ok(vec![Action::Send {
                to: from,
                message: WireMessage::NeighborBatch(NeighborBatch {
                    from: self.local,
                    models: shard.vertices.iter().map(|v| v.model).collect(),
                    positions: positions_of(shard),
                }),
            }])
        } else if let Some(rows) = self.caches.remove(&from) {
            Ok(vec![self.adjacency_reply(from, rows, shard)])
        } else {
            // The cache is built when our cursor reaches the requester.
            debug!(worker = self.local.0, from = from.0, "queueing pull request");
            self.pending.push(from);
            Ok(Vec::new())
        }
    }

    /// Vertex data from the cursor worker ("next" case).
    pub fn on_neighbors<R: Rng + ?Sized>(
        &mut self,
        batch: NeighborBatch,
        shard: &mut Shard,
        catalog: &ModelCatalog,
        rng: &mut R,
    ) -> Result<Vec<Action>, ProtocolError> {
        if batch.from.0 != self.cursor || batch.from <= self.local {
            return Err(ProtocolError::UnexpectedSender {
                worker: self.local,
                from: batch.from,
                message: "NeighborBatch",
                cursor: self.cursor,
            });
        }
        if !batch.is_consistent() {
            return Err(ProtocolError::SizeMismatch {
                worker: self.local,
                phase: Phase::Connect,
                from: batch.from,
                declared: batch.positions.len() as u64,
                actual: batch.models.len() as u64,
            });
        }
        debug!(
            worker = self.local.0,
            resolving = batch.from.0,
            vertices = batch.len(),
            "connecting to next worker"
        );

        self.dist.record(batch.from, batch.len() as u64);
        let rows = self.resolve_next(&batch, shard, catalog, rng)?;

        let mut actions = Vec::new();
        if let Some(i) = self.pending.iter().position(|&w| w == batch.from) {
            // The requester asked before the cache existed; answer now.
            self.pending.remove(i);
            actions.push(self.adjacency_reply(batch.from, rows, shard));
        } else {
            self.caches.insert(batch.from, rows);
        }

        self.cursor += 1;
        actions.extend(self.advance(shard, catalog, rng)?);
        Ok(actions)
    }

    /// Cached adjacency from the cursor worker ("prev" case).
    pub fn on_adjacency<R: Rng + ?Sized>(
        &mut self,
        batch: AdjacencyBatch,
        shard: &mut Shard,
        catalog: &ModelCatalog,
        rng: &mut R,
    ) -> Result<Vec<Action>, ProtocolError> {
        if batch.from.0 != self.cursor || batch.from >= self.local {
            return Err(ProtocolError::UnexpectedSender {
                worker: self.local,
                from: batch.from,
                message: "AdjacencyBatch",
                cursor: self.cursor,
            });
        }
        if !batch.is_consistent() {
            return Err(ProtocolError::SizeMismatch {
                worker: self.local,
                phase: Phase::Connect,
                from: batch.from,
                declared: batch.positions.len() as u64,
                actual: batch.rows.len() as u64,
            });
        }
        debug!(
            worker = self.local.0,
            resolving = batch.from.0,
            entries = batch.entry_count(),
            "connecting to prev worker"
        );

        self.dist.record(batch.from, batch.len() as u64);
        let offset = self.dist.offset(batch.from);
        for (j, row) in batch.rows.iter().enumerate() {
            for cached in row {
                let len = shard.len() as u64;
                let Some(vertex) = shard.vertices.get_mut(cached.target as usize) else {
                    return Err(ProtocolError::CacheTargetOutOfRange {
                        worker: self.local,
                        from: batch.from,
                        target: cached.target,
                        len,
                    });
                };
                let distance = vertex.position.distance_to(&batch.positions[j]);
                let entry = edge_entry(
                    catalog,
                    GlobalVertexId(offset + j as u64),
                    cached.model,
                    distance,
                    rng,
                )?;
                vertex.adjacency.push(entry);
            }
        }

        self.cursor += 1;
        self.advance(shard, catalog, rng)
    }

    /// Walk the cursor as far as local work allows, emitting the pull
    /// request (or the completion barrier) that stops it.
    fn advance<R: Rng + ?Sized>(
        &mut self,
        shard: &mut Shard,
        catalog: &ModelCatalog,
        rng: &mut R,
    ) -> Result<Vec<Action>, ProtocolError> {
        let mut actions = Vec::new();
        loop {
            if self.cursor == self.workers {
                if !self.complete {
                    self.complete = true;
                    info!(
                        worker = self.local.0,
                        vertices = self.dist.total(),
                        edges = shard.edge_count(),
                        "connection walk complete"
                    );
                    actions.push(Action::PhaseComplete(Phase::Connect));
                }
                break;
            }
            if self.cursor == self.local.0 {
                self.dist.record(self.local, shard.len() as u64);
                self.resolve_self(shard, catalog, rng)?;
                self.cursor += 1;
            } else {
                actions.push(Action::Send {
                    to: WorkerId(self.cursor),
                    message: WireMessage::ConnRequest(ConnRequest { from: self.local }),
                });
                break;
            }
        }
        Ok(actions)
    }

    /// Test every unordered local pair in both directions.
    fn resolve_self<R: Rng + ?Sized>(
        &mut self,
        shard: &mut Shard,
        catalog: &ModelCatalog,
        rng: &mut R,
    ) -> Result<(), ProtocolError> {
        debug!(worker = self.local.0, "connecting within shard");
        let offset = self.dist.offset(self.local);
        let n = shard.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let distance = shard.vertices[i]
                    .position
                    .distance_to(&shard.vertices[j].position);
                let forward =
                    make_connection(catalog, shard.vertices[i].model, shard.vertices[j].model, distance, rng);
                let reverse =
                    make_connection(catalog, shard.vertices[j].model, shard.vertices[i].model, distance, rng);
                if forward.is_none() && reverse.is_none() {
                    continue;
                }
                // Either direction hit: both endpoints list each other,
                // with a stub standing in for the missing direction.
                let entry_j = edge_entry(
                    catalog,
                    GlobalVertexId(offset + i as u64),
                    forward,
                    distance,
                    rng,
                )?;
                let entry_i = edge_entry(
                    catalog,
                    GlobalVertexId(offset + j as u64),
                    reverse,
                    distance,
                    rng,
                )?;
                shard.vertices[j].adjacency.push(entry_j);
                shard.vertices[i].adjacency.push(entry_i);
            }
        }
        Ok(())
    }

    /// Test both directions against a higher-indexed worker's vertices,
    /// caching forward rows for it to pull.
    fn resolve_next<R: Rng + ?Sized>(
        &mut self,
        batch: &NeighborBatch,
        shard: &mut Shard,
        catalog: &ModelCatalog,
        rng: &mut R,
    ) -> Result<Vec<Vec<CachedEdge>>, ProtocolError> {
        let offset = self.dist.offset(batch.from);
        let mut rows = vec![Vec::new(); shard.len()];
        for (i, row) in rows.iter_mut().enumerate() {
            for j in 0..batch.len() {
                let distance = shard.vertices[i].position.distance_to(&batch.positions[j]);
                let forward =
                    make_connection(catalog, shard.vertices[i].model, batch.models[j], distance, rng);
                let reverse =
                    make_connection(catalog, batch.models[j], shard.vertices[i].model, distance, rng);
                if forward.is_none() && reverse.is_none() {
                    continue;
                }
                row.push(CachedEdge {
                    target: j as u64,
                    model: forward,
                });
                let entry = edge_entry(
                    catalog,
                    GlobalVertexId(offset + j as u64),
                    reverse,
                    distance,
                    rng,
                )?;
                shard.vertices[i].adjacency.push(entry);
            }
        }
        Ok(rows)
    }

    fn adjacency_reply(
        &self,
        to: WorkerId,
        rows: Vec<Vec<CachedEdge>>,
        shard: &Shard,
    ) -> Action {
        Action::Send {
            to,
            message: WireMessage::AdjacencyBatch(AdjacencyBatch {
                from: self.local,
                positions: positions_of(shard),
                rows,
            }),
        }
    }
}

fn positions_of(shard: &Shard) -> Vec<Position> {
    shard.vertices.iter().map(|v| v.position).collect()
}
