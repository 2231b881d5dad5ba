//! Deterministic shard construction.
//!
//! Each worker materializes its slice of the declared vertex populations:
//! the per-model order is split across all logical parts, vertices are
//! placed inside their template's shape, and state/tick vectors are sampled
//! from the catalog. Everything is driven by the worker's seeded random
//! stream, so the same (seed, P) pair reproduces the same shard.

use neurograph_core::Topology;
use neurograph_types::{
    GenerationError, GraphSpec, ModelCatalog, ModelKind, Position, Shape, Shard, ShardVertex,
};
use rand::Rng;
use rand_distr::StandardNormal;
use std::f64::consts::PI;
use tracing::{debug, info};

/// Builds one worker's shard from the broadcast catalog and graph spec.
pub struct ShardBuilder<'a> {
    topology: &'a dyn Topology,
    catalog: &'a ModelCatalog,
    graph: &'a GraphSpec,
}

impl<'a> ShardBuilder<'a> {
    /// Create a builder for the local worker.
    pub fn new(topology: &'a dyn Topology, catalog: &'a ModelCatalog, graph: &'a GraphSpec) -> Self {
        Self {
            topology,
            catalog,
            graph,
        }
    }

    /// Vertex counts per locally owned part, per vertex template.
    ///
    /// Every template's order is spread across all `total_parts` parts:
    /// `order / total_parts` everywhere, with the remainder handed to
    /// consecutive parts starting where the previous template's remainder
    /// stopped (wrapping). Summed over all workers' parts this reproduces
    /// each declared order exactly.
    pub fn per_part_orders(&self) -> Vec<Vec<u64>> {
        let parts = self.topology.total_parts() as u64;
        let (first, count) = self.topology.local_parts();
        let mut counts = vec![vec![0u64; self.graph.vertices.len()]; count as usize];

        let mut xrem: u64 = 0;
        for (i, template) in self.graph.vertices.iter().enumerate() {
            let div = template.order / parts;
            let rem = template.order % parts;
            for k in 0..count as u64 {
                let g = first.0 as u64 + k;
                let extra = (g >= xrem && g < rem + xrem)
                    || (rem + xrem >= parts && g < xrem && g < (rem + xrem) % parts);
                counts[k as usize][i] = div + u64::from(extra);
            }
            xrem = (xrem + rem) % parts;
        }
        counts
    }

    /// Materialize the local shard.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Shard, GenerationError> {
        // A concrete vertex can never carry the "none" sentinel.
        for template in &self.graph.vertices {
            if template.model.is_none() {
                return Err(GenerationError::NoneModel);
            }
            match self.catalog.model(template.model) {
                Some(model) if model.kind == ModelKind::Vertex => {}
                Some(_) => {
                    return Err(GenerationError::KindMismatch {
                        model: template.model,
                        expected: "vertex",
                    })
                }
                None => {
                    return Err(GenerationError::UnknownModel {
                        model: template.model,
                    })
                }
            }
        }

        let counts = self.per_part_orders();
        let part_sizes: Vec<u64> = counts.iter().map(|row| row.iter().sum()).collect();
        let total: u64 = part_sizes.iter().sum();

        info!(
            worker = self.topology.local_worker().0,
            vertices = total,
            parts = part_sizes.len(),
            "building shard"
        );
        debug!(worker = self.topology.local_worker().0, ?part_sizes);

        // First pass: models and coordinates, grouped by
        // (part, template, within-template sequence).
        let mut vertices = Vec::with_capacity(total as usize);
        for row in &counts {
            for (i, &n) in row.iter().enumerate() {
                let template = &self.graph.vertices[i];
                for _ in 0..n {
                    vertices.push(ShardVertex {
                        model: template.model,
                        position: sample_position(&template.shape, rng),
                        state: Vec::new(),
                        ticks: Vec::new(),
                        adjacency: Vec::new(),
                        events: Vec::new(),
                    });
                }
            }
        }

        // Second pass: state and tick vectors, field by field in
        // declaration order.
        for vertex in &mut vertices {
            vertex.state = self.catalog.vertex_state(vertex.model, rng)?;
            vertex.ticks = self.catalog.vertex_ticks(vertex.model, rng)?;
        }

        Ok(Shard {
            vertices,
            part_sizes,
        })
    }
}

/// Draw one coordinate uniformly inside the shape.
fn sample_position<R: Rng + ?Sized>(shape: &Shape, rng: &mut R) -> Position {
    match *shape {
        Shape::Disk { radius } => {
            let theta = 2.0 * PI * rng.gen::<f64>();
            let r = radius * rng.gen::<f64>().sqrt();
            Position([r * theta.cos(), r * theta.sin(), 0.0])
        }
        Shape::Ball { radius } => {
            let u: f64 = rng.gen();
            let x: f64 = rng.sample(StandardNormal);
            let y: f64 = rng.sample(StandardNormal);
            let z: f64 = rng.sample(StandardNormal);
            let r = radius * u.cbrt() / (x * x + y * y + z * z).sqrt();
            Position([r * x, r * y, r * z])
        }
    }
}
