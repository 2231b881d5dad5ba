//! The per-worker slice of the network.
//!
//! A worker is the sole mutator of its shard: vertices are created by the
//! shard builder, gain adjacency entries during connection resolution, are
//! repackaged by redistribution, relabeled by renumbering, and then frozen
//! for the external writer.

use crate::{
    CsrFragment, GlobalVertexId, ModelCatalog, ModelId, PartRow, PartitionId, ShardDistribution,
    Tick,
};
use serde::{Deserialize, Serialize};

/// A 3-D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position(pub [f64; 3]);

impl Position {
    /// Euclidean distance to another position.
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.0[0] - other.0[0];
        let dy = self.0[1] - other.0[1];
        let dz = self.0[2] - other.0[2];
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// One adjacency slot of a vertex.
///
/// An entry on vertex v for peer u records the directed edge u→v when the
/// model is concrete. A `NONE` model marks a stub kept so that both
/// endpoints of a one-directional pair list each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjacencyEntry {
    pub peer: GlobalVertexId,
    pub edge_model: ModelId,
    pub state: Vec<f64>,
    pub ticks: Vec<Tick>,
}

impl AdjacencyEntry {
    /// Bookkeeping stub: adjacency exists but carries no state.
    pub fn stub(peer: GlobalVertexId) -> Self {
        Self {
            peer,
            edge_model: ModelId::NONE,
            state: Vec::new(),
            ticks: Vec::new(),
        }
    }
}

/// A timed event waiting on a vertex, referencing one of its adjacency
/// slots (0 is the vertex itself, j + 1 is adjacency slot j) and the
/// global id of the source vertex that scheduled it.
///
/// Both references survive redistribution and are rewritten by the
/// renumbering fix-up pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredEvent {
    pub diffuse: Tick,
    pub kind: u32,
    pub source: GlobalVertexId,
    pub slot: u64,
    pub payload: f64,
}

/// One vertex owned by this worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardVertex {
    pub model: ModelId,
    pub position: Position,
    pub state: Vec<f64>,
    pub ticks: Vec<Tick>,
    pub adjacency: Vec<AdjacencyEntry>,
    pub events: Vec<DeferredEvent>,
}

/// The set of vertices currently owned by one worker, grouped by its
/// locally owned parts (in part order).
#[derive(Debug, Clone, Default)]
pub struct Shard {
    pub vertices: Vec<ShardVertex>,
    /// Vertices per locally owned part; sums to `vertices.len()`.
    pub part_sizes: Vec<u64>,
}

impl Shard {
    /// Number of local vertices.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the shard owns no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Total adjacency entries across the shard.
    pub fn edge_count(&self) -> u64 {
        self.vertices.iter().map(|v| v.adjacency.len() as u64).sum()
    }

    /// CSR view of the shard for the external partitioner: prefix array,
    /// flat peer list, coordinates, and unit vertex weights.
    pub fn to_csr(&self, dist: &ShardDistribution) -> CsrFragment {
        let mut xadj = Vec::with_capacity(self.len() + 1);
        let mut adjcy = Vec::with_capacity(self.edge_count() as usize);
        xadj.push(0);
        for vertex in &self.vertices {
            for entry in &vertex.adjacency {
                adjcy.push(entry.peer.0);
            }
            xadj.push(adjcy.len() as u64);
        }
        CsrFragment {
            vtxdist: dist.as_slice().to_vec(),
            xadj,
            adjcy,
            coords: self.vertices.iter().map(|v| v.position).collect(),
            vwgt: vec![1; self.len()],
        }
    }

    /// Per-part size rows for the distribution descriptor: vertex, edge,
    /// state, and tick counts of each locally owned part.
    pub fn part_rows(&self, first_part: PartitionId) -> Vec<PartRow> {
        let mut rows = Vec::with_capacity(self.part_sizes.len());
        let mut next = 0usize;
        for (k, &size) in self.part_sizes.iter().enumerate() {
            let mut row = PartRow {
                part: PartitionId(first_part.0 + k as u32),
                vertices: size,
                edges: 0,
                states: 0,
                ticks: 0,
            };
            for vertex in &self.vertices[next..next + size as usize] {
                row.edges += vertex.adjacency.len() as u64;
                row.states += vertex.state.len() as u64;
                row.ticks += vertex.ticks.len() as u64;
                for entry in &vertex.adjacency {
                    row.states += entry.state.len() as u64;
                    row.ticks += entry.ticks.len() as u64;
                }
            }
            next += size as usize;
            rows.push(row);
        }
        rows
    }

    /// Materialize the writer-boundary records, in local vertex order.
    pub fn export(&self, catalog: &ModelCatalog) -> Vec<VertexExport> {
        self.vertices
            .iter()
            .map(|vertex| VertexExport {
                position: vertex.position,
                model: catalog.name_of(vertex.model).to_string(),
                state: vertex.state.clone(),
                ticks: vertex.ticks.clone(),
                adjacency: vertex
                    .adjacency
                    .iter()
                    .map(|entry| EdgeExport {
                        target: entry.peer,
                        model: catalog.name_of(entry.edge_model).to_string(),
                        state: entry.state.clone(),
                        ticks: entry.ticks.clone(),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Writer-boundary record for one final vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexExport {
    pub position: Position,
    pub model: String,
    pub state: Vec<f64>,
    pub ticks: Vec<Tick>,
    pub adjacency: Vec<EdgeExport>,
}

/// Writer-boundary record for one adjacency slot.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeExport {
    pub target: GlobalVertexId,
    pub model: String,
    pub state: Vec<f64>,
    pub ticks: Vec<Tick>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Generator, Model, ModelKind};

    fn test_vertex(model: u32, x: f64, peers: &[(u64, u32)]) -> ShardVertex {
        ShardVertex {
            model: ModelId(model),
            position: Position([x, 0.0, 0.0]),
            state: vec![1.0, 2.0],
            ticks: vec![Tick(5)],
            adjacency: peers
                .iter()
                .map(|&(peer, m)| AdjacencyEntry {
                    peer: GlobalVertexId(peer),
                    edge_model: ModelId(m),
                    state: if m == 0 { vec![] } else { vec![0.5] },
                    ticks: vec![],
                })
                .collect(),
            events: Vec::new(),
        }
    }

    #[test]
    fn test_distance() {
        let a = Position([0.0, 0.0, 0.0]);
        let b = Position([3.0, 4.0, 0.0]);
        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!(b.distance_to(&a), 5.0);
    }

    #[test]
    fn test_to_csr() {
        let shard = Shard {
            vertices: vec![
                test_vertex(1, 0.0, &[(1, 2), (5, 0)]),
                test_vertex(1, 1.0, &[(0, 2)]),
            ],
            part_sizes: vec![2],
        };
        let dist = ShardDistribution::from_counts(&[2, 4]);
        let csr = shard.to_csr(&dist);
        assert_eq!(csr.vtxdist, vec![0, 2, 6]);
        assert_eq!(csr.xadj, vec![0, 2, 3]);
        assert_eq!(csr.adjcy, vec![1, 5, 0]);
        assert_eq!(csr.vwgt, vec![1, 1]);
        assert_eq!(csr.coords.len(), 2);
    }

    #[test]
    fn test_part_rows_count_state_and_ticks() {
        let shard = Shard {
            vertices: vec![
                test_vertex(1, 0.0, &[(1, 2)]),
                test_vertex(1, 1.0, &[]),
                test_vertex(2, 2.0, &[(0, 0)]),
            ],
            part_sizes: vec![2, 1],
        };
        let rows = shard.part_rows(PartitionId(4));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].part, PartitionId(4));
        assert_eq!(rows[0].vertices, 2);
        assert_eq!(rows[0].edges, 1);
        // Two vertex state pairs plus one edge state value.
        assert_eq!(rows[0].states, 5);
        assert_eq!(rows[0].ticks, 2);
        assert_eq!(rows[1].part, PartitionId(5));
        assert_eq!(rows[1].vertices, 1);
        assert_eq!(rows[1].edges, 1);
        assert_eq!(rows[1].states, 2);
    }

    #[test]
    fn test_export_uses_model_names() {
        let catalog = ModelCatalog::new(
            vec![
                Model {
                    name: "v1".into(),
                    kind: ModelKind::Vertex,
                    state: vec![Generator::Const { value: 0.0 }; 2],
                    ticks: vec![Generator::Const { value: 0.0 }],
                },
                Model {
                    name: "syn".into(),
                    kind: ModelKind::Edge,
                    state: vec![Generator::Const { value: 0.0 }],
                    ticks: vec![],
                },
            ],
            vec![],
        )
        .unwrap();

        let shard = Shard {
            vertices: vec![test_vertex(1, 0.0, &[(7, 2), (9, 0)])],
            part_sizes: vec![1],
        };
        let exports = shard.export(&catalog);
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].model, "v1");
        assert_eq!(exports[0].adjacency[0].target, GlobalVertexId(7));
        assert_eq!(exports[0].adjacency[0].model, "syn");
        assert_eq!(exports[0].adjacency[1].model, "none");
    }
}
