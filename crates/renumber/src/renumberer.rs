//! The renumbering relay.
//!
//! Final ids are contiguous in worker-rank order: worker 0 owns
//! `[0, n0)`, worker 1 the next `n1`, and so on. Each worker broadcasts
//! its old → new map when the relay cursor `cpdat` reaches its own index;
//! every worker applies each map in cursor order, rewriting matched
//! adjacency references and appending their attribute data sorted by new
//! id. Maps arriving early are buffered until causally ready. Once every
//! map is applied, a fix-up pass remaps deferred-event slot references
//! from old adjacency slots to their new positions.

use neurograph_core::{Action, Phase, ProtocolError, Topology};
use neurograph_messages::{RenumberEntry, RenumberMap, VertexRecord, WireMessage};
use neurograph_types::{
    AdjacencyEntry, GlobalVertexId, Shard, ShardDistribution, ShardVertex, WorkerId,
};
use std::collections::HashMap;
use tracing::{debug, info};

/// One vertex mid-relabel: the gathered record (old adjacency, old event
/// references) plus the new adjacency accumulating in map order.
#[derive(Debug)]
struct RenumberVertex {
    record: VertexRecord,
    /// Event sources as they were before any map applied; matching is
    /// always against these, since new ids can collide with old ones.
    old_sources: Vec<GlobalVertexId>,
    adjacency: Vec<AdjacencyEntry>,
    /// Old slot id of each new slot, starting with 0 (the vertex itself).
    slot_map: Vec<u64>,
}

/// Per-worker context of the renumbering phase.
#[derive(Debug)]
pub struct GlobalRenumberer {
    local: WorkerId,
    workers: u32,
    /// The relay cursor: index of the worker whose map is applied next.
    cursor: u32,
    dist: ShardDistribution,
    vertices: Vec<RenumberVertex>,
    part_sizes: Vec<u64>,
    /// Maps buffered until the cursor reaches their sender.
    pending: Vec<RenumberMap>,
    started: bool,
    complete: bool,
}

impl GlobalRenumberer {
    /// Create the renumberer over the gathered parts (already sorted), in
    /// part order.
    pub fn new(topology: &dyn Topology, parts: Vec<Vec<VertexRecord>>) -> Self {
        let part_sizes = parts.iter().map(|p| p.len() as u64).collect();
        let vertices = parts
            .into_iter()
            .flatten()
            .map(|record| RenumberVertex {
                old_sources: record.events.iter().map(|e| e.source).collect(),
                record,
                adjacency: Vec::new(),
                slot_map: vec![0],
            })
            .collect();
        Self {
            local: topology.local_worker(),
            workers: topology.worker_count(),
            cursor: 0,
            dist: ShardDistribution::empty(topology.worker_count()),
            vertices,
            part_sizes,
            pending: Vec::new(),
            started: false,
            complete: false,
        }
    }

    /// Whether every map has been applied and the fix-up pass has run.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Final vertex distribution, filled in cursor order.
    pub fn dist(&self) -> &ShardDistribution {
        &self.dist
    }

    /// Begin the relay; worker 0 broadcasts its map immediately.
    pub fn start(&mut self) -> Result<Vec<Action>, ProtocolError> {
        if self.started {
            return Err(ProtocolError::OutOfPhase {
                worker: self.local,
                event: "RenumberStart",
            });
        }
        self.started = true;
        info!(
            worker = self.local.0,
            vertices = self.vertices.len(),
            "renumbering network"
        );
        if self.cursor == self.local.0 {
            Ok(vec![Action::Broadcast {
                message: WireMessage::RenumberMap(self.build_map()),
            }])
        } else {
            Ok(Vec::new())
        }
    }

    /// Queue a map and apply everything that is causally ready.
    pub fn on_map(&mut self, map: RenumberMap) -> Result<Vec<Action>, ProtocolError> {
        if map.from.0 >= self.workers || self.complete {
            return Err(ProtocolError::UnexpectedSender {
                worker: self.local,
                from: map.from,
                message: "RenumberMap",
                cursor: self.cursor,
            });
        }
        self.pending.push(map);

        let mut actions = Vec::new();
        while let Some(i) = self
            .pending
            .iter()
            .position(|m| m.from.0 == self.cursor)
        {
            let map = self.pending.remove(i);
            debug!(
                worker = self.local.0,
                from = map.from.0,
                entries = map.len(),
                "applying renumber map"
            );
            self.apply(map);
            self.cursor += 1;

            if self.cursor == self.workers {
                self.fixup()?;
                self.complete = true;
                info!(worker = self.local.0, total = self.dist.total(), "renumbering complete");
                actions.push(Action::PhaseComplete(Phase::Renumber));
                break;
            }
            if self.cursor == self.local.0 {
                actions.push(Action::Broadcast {
                    message: WireMessage::RenumberMap(self.build_map()),
                });
            }
        }
        Ok(actions)
    }

    /// The local old → new map: part-then-sorted order defines the rank.
    fn build_map(&self) -> RenumberMap {
        RenumberMap {
            from: self.local,
            entries: self
                .vertices
                .iter()
                .enumerate()
                .map(|(rank, v)| RenumberEntry {
                    old: v.record.original_id,
                    rank: rank as u64,
                })
                .collect(),
        }
    }

    /// Rewrite every adjacency reference owned by the map's sender.
    fn apply(&mut self, map: RenumberMap) {
        self.dist.record(map.from, map.len() as u64);
        let offset = self.dist.offset(map.from);
        let old_to_new: HashMap<GlobalVertexId, GlobalVertexId> = map
            .entries
            .iter()
            .map(|e| (e.old, GlobalVertexId(offset + e.rank)))
            .collect();

        for vertex in &mut self.vertices {
            let mut matched: Vec<(GlobalVertexId, usize)> = Vec::new();
            for (j, entry) in vertex.record.adjacency.iter().enumerate() {
                let Some(&new_id) = old_to_new.get(&entry.peer) else {
                    continue;
                };
                matched.push((new_id, j));
                // Deferred events referencing this peer follow it to the
                // new id space.
                for (event, old_source) in
                    vertex.record.events.iter_mut().zip(&vertex.old_sources)
                {
                    if *old_source == entry.peer {
                        event.source = new_id;
                    }
                }
            }
            // Ascending by new id; maps arrive in id-space order, so the
            // whole adjacency ends up canonically sorted.
            matched.sort_by_key(|&(new_id, _)| new_id);
            for (new_id, j) in matched {
                let old = &vertex.record.adjacency[j];
                vertex.adjacency.push(AdjacencyEntry {
                    peer: new_id,
                    edge_model: old.edge_model,
                    state: old.state.clone(),
                    ticks: old.ticks.clone(),
                });
                vertex.slot_map.push(j as u64 + 1);
            }
        }
    }

    /// Remap deferred-event slot references to the new adjacency order.
    fn fixup(&mut self) -> Result<(), ProtocolError> {
        for vertex in &mut self.vertices {
            if vertex.record.events.is_empty() {
                continue;
            }
            let new_slot: HashMap<u64, u64> = vertex
                .slot_map
                .iter()
                .enumerate()
                .map(|(new, &old)| (old, new as u64))
                .collect();
            for event in &mut vertex.record.events {
                event.slot = new_slot.get(&event.slot).copied().ok_or(
                    ProtocolError::DanglingEventSlot {
                        worker: self.local,
                        vertex: vertex.record.original_id,
                        slot: event.slot,
                    },
                )?;
            }
        }
        Ok(())
    }

    /// The relabeled shard and the final distribution.
    pub fn into_shard(self) -> (Shard, ShardDistribution) {
        let vertices = self
            .vertices
            .into_iter()
            .map(|v| ShardVertex {
                model: v.record.model,
                position: v.record.position,
                state: v.record.state,
                ticks: v.record.ticks,
                adjacency: v.adjacency,
                events: v.record.events,
            })
            .collect();
        (
            Shard {
                vertices,
                part_sizes: self.part_sizes,
            },
            self.dist,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurograph_core::{BuildConfig, StaticTopology};
    use neurograph_types::{DeferredEvent, ModelId, Position, Tick};

    fn topology(local: u32, workers: u32) -> StaticTopology {
        StaticTopology::new(WorkerId(local), &BuildConfig::new(workers, workers)).unwrap()
    }

    fn record(original: u64, model: u32, peers: &[u64]) -> VertexRecord {
        VertexRecord {
            original_id: GlobalVertexId(original),
            model: ModelId(model),
            position: Position([original as f64, 0.0, 0.0]),
            state: vec![original as f64],
            ticks: vec![],
            adjacency: peers
                .iter()
                .map(|&p| AdjacencyEntry {
                    peer: GlobalVertexId(p),
                    edge_model: ModelId(1),
                    state: vec![p as f64],
                    ticks: vec![],
                })
                .collect(),
            events: vec![],
        }
    }

    fn broadcast_map(actions: &[Action]) -> RenumberMap {
        match &actions[0] {
            Action::Broadcast {
                message: WireMessage::RenumberMap(m),
            } => m.clone(),
            other => panic!("expected RenumberMap broadcast, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_single_worker_relabels_and_sorts() {
        let topology = topology(0, 1);
        // Gathered order: originals 5, 3, 9 become new ids 0, 1, 2.
        let parts = vec![vec![
            record(5, 1, &[3, 9]),
            record(3, 1, &[9, 5]),
            record(9, 2, &[5]),
        ]];
        let mut renumberer = GlobalRenumberer::new(&topology, parts);
        let actions = renumberer.start().unwrap();
        let map = broadcast_map(&actions);
        assert_eq!(map.len(), 3);

        let actions = renumberer.on_map(map).unwrap();
        assert!(matches!(actions[0], Action::PhaseComplete(Phase::Renumber)));
        assert!(renumberer.is_complete());

        let (shard, dist) = renumberer.into_shard();
        assert_eq!(dist.total(), 3);
        // Vertex 0 (was 5): peers 3 → 1 and 9 → 2, sorted ascending.
        let peers: Vec<u64> = shard.vertices[0].adjacency.iter().map(|e| e.peer.0).collect();
        assert_eq!(peers, vec![1, 2]);
        // Vertex 1 (was 3): peers 9 → 2 and 5 → 0 re-sort to [0, 2], and
        // the state follows the entry.
        let peers: Vec<u64> = shard.vertices[1].adjacency.iter().map(|e| e.peer.0).collect();
        assert_eq!(peers, vec![0, 2]);
        assert_eq!(shard.vertices[1].adjacency[0].state, vec![5.0]);
        assert_eq!(shard.vertices[1].adjacency[1].state, vec![9.0]);
    }

    #[test]
    fn test_two_worker_relay_is_a_bijection() {
        let topology0 = topology(0, 2);
        let topology1 = topology(1, 2);
        // Originals 0..4 redistributed as: worker 0 holds [2, 0],
        // worker 1 holds [3, 1].
        let mut renumberer0 =
            GlobalRenumberer::new(&topology0, vec![vec![record(2, 1, &[0, 1, 3]), record(0, 1, &[2])]]);
        let mut renumberer1 =
            GlobalRenumberer::new(&topology1, vec![vec![record(3, 1, &[2]), record(1, 1, &[0, 3])]]);

        // Worker 0 opens the relay; worker 1 waits.
        let actions0 = renumberer0.start().unwrap();
        let map0 = broadcast_map(&actions0);
        assert!(renumberer1.start().unwrap().is_empty());

        // Worker 1 receives map 0, applies it, and broadcasts its own.
        let actions = renumberer1.on_map(map0.clone()).unwrap();
        let map1 = broadcast_map(&actions);

        // Both workers finish once both maps are applied.
        assert!(renumberer0.on_map(map0).unwrap().is_empty());
        let actions = renumberer0.on_map(map1.clone()).unwrap();
        assert!(matches!(actions[0], Action::PhaseComplete(Phase::Renumber)));
        let actions = renumberer1.on_map(map1).unwrap();
        assert!(matches!(actions[0], Action::PhaseComplete(Phase::Renumber)));

        let (shard0, dist0) = renumberer0.into_shard();
        let (shard1, dist1) = renumberer1.into_shard();
        assert_eq!(dist0.as_slice(), &[0, 2, 4]);
        assert_eq!(dist0, dist1);

        // old → new: 2→0, 0→1, 3→2, 1→3. Every new id appears exactly
        // once across both workers' id ranges.
        // Worker 0 vertex 0 (was 2) had peers [0, 1, 3] → [1, 3, 2] sorted.
        let peers: Vec<u64> = shard0.vertices[0].adjacency.iter().map(|e| e.peer.0).collect();
        assert_eq!(peers, vec![1, 2, 3]);
        // Worker 1 vertex 3 (was 1) had peers [0, 3] → [1, 2] sorted.
        let peers: Vec<u64> = shard1.vertices[1].adjacency.iter().map(|e| e.peer.0).collect();
        assert_eq!(peers, vec![1, 2]);
    }

    #[test]
    fn test_out_of_order_map_is_buffered() {
        let topology = topology(2, 3);
        let mut renumberer = GlobalRenumberer::new(&topology, vec![vec![record(4, 1, &[])]]);
        assert!(renumberer.start().unwrap().is_empty());

        let map = |from: u32, olds: &[u64]| RenumberMap {
            from: WorkerId(from),
            entries: olds
                .iter()
                .enumerate()
                .map(|(rank, &old)| RenumberEntry {
                    old: GlobalVertexId(old),
                    rank: rank as u64,
                })
                .collect(),
        };

        // Map from worker 1 arrives first: buffered, nothing applied.
        assert!(renumberer.on_map(map(1, &[3])).unwrap().is_empty());
        assert_eq!(renumberer.dist().total(), 0);

        // Map from worker 0 unblocks both, and the cursor reaching the
        // local index broadcasts our own map.
        let actions = renumberer.on_map(map(0, &[0, 1])).unwrap();
        let own = broadcast_map(&actions);
        assert_eq!(own.from, WorkerId(2));
        assert_eq!(renumberer.dist().as_slice(), &[0, 2, 3, 0]);

        let actions = renumberer.on_map(own).unwrap();
        assert!(matches!(actions[0], Action::PhaseComplete(Phase::Renumber)));
    }

    #[test]
    fn test_event_references_are_remapped() {
        let topology = topology(0, 1);
        // Vertex (old 7) has peers [5, 2]; an event scheduled by old
        // vertex 5 referencing its adjacency slot 1 (the entry for 5).
        let mut vertex = record(7, 1, &[5, 2]);
        vertex.events.push(DeferredEvent {
            diffuse: Tick(100),
            kind: 1,
            source: GlobalVertexId(5),
            slot: 1,
            payload: 0.5,
        });
        let parts = vec![vec![record(2, 1, &[]), record(5, 1, &[]), vertex]];
        let mut renumberer = GlobalRenumberer::new(&topology, parts);
        let map = broadcast_map(&renumberer.start().unwrap());
        renumberer.on_map(map).unwrap();

        let (shard, _) = renumberer.into_shard();
        // old → new: 2→0, 5→1, 7→2. The vertex's peers re-sort to [0, 1];
        // old slot 1 (peer 5) is now slot 2.
        let event = &shard.vertices[2].events[0];
        assert_eq!(event.source, GlobalVertexId(1));
        assert_eq!(event.slot, 2);
    }

    #[test]
    fn test_dangling_event_slot_is_fatal() {
        let topology = topology(0, 1);
        let mut vertex = record(7, 1, &[]);
        vertex.events.push(DeferredEvent {
            diffuse: Tick(0),
            kind: 0,
            source: GlobalVertexId(7),
            slot: 3,
            payload: 0.0,
        });
        let mut renumberer = GlobalRenumberer::new(&topology, vec![vec![vertex]]);
        let map = broadcast_map(&renumberer.start().unwrap());
        let err = renumberer.on_map(map).unwrap_err();
        assert!(matches!(err, ProtocolError::DanglingEventSlot { slot: 3, .. }));
    }
}
