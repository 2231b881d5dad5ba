//! Graph build templates.
//!
//! A `GraphSpec` is the already-parsed graph description: how many vertices
//! of each model to create and inside which spatial shape. Connection rules
//! live in the catalog's edge templates.

use crate::ModelId;
use serde::{Deserialize, Serialize};

/// Spatial region vertices of one template are scattered in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Uniform over a disk of the given radius in the z = 0 plane.
    Disk { radius: f64 },
    /// Uniform over a solid ball of the given radius.
    Ball { radius: f64 },
}

/// One vertex population: model, global count, and spatial shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexTemplate {
    pub model: ModelId,
    /// Total vertices of this model across the whole job.
    pub order: u64,
    pub shape: Shape,
}

/// The graph description handed to every worker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphSpec {
    pub vertices: Vec<VertexTemplate>,
}

impl GraphSpec {
    /// Declared total vertex count across all templates.
    pub fn total_order(&self) -> u64 {
        self.vertices.iter().map(|v| v.order).sum()
    }
}
