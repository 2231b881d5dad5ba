//! Models, edge templates, and the validated catalog.
//!
//! The catalog is built once from the already-parsed model description,
//! broadcast identically to every worker, and never mutated afterwards.

use crate::{GenerationError, Generator, ModelId, Tick};
use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// What a model describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    Vertex,
    Edge,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Vertex => write!(f, "vertex"),
            ModelKind::Edge => write!(f, "edge"),
        }
    }
}

/// A named template controlling how an entity's attributes are generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    pub kind: ModelKind,
    /// State field generators, in declaration order.
    pub state: Vec<Generator>,
    /// Tick field generators, in declaration order.
    pub ticks: Vec<Generator>,
}

/// One additive term of a connection-probability threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProbabilityTerm {
    /// Distance-independent probability.
    Constant { probability: f64 },
    /// Decaying sigmoid of distance.
    Sigmoid {
        max_prob: f64,
        midpoint: f64,
        slope: f64,
    },
}

impl ProbabilityTerm {
    /// Evaluate this term at the given distance.
    pub fn evaluate(&self, distance: f64) -> f64 {
        match *self {
            ProbabilityTerm::Constant { probability } => probability,
            ProbabilityTerm::Sigmoid {
                max_prob,
                midpoint,
                slope,
            } => max_prob * (1.0 - 1.0 / (1.0 + (-slope * (distance - midpoint)).exp())),
        }
    }
}

/// Connection rule between one source vertex model and a set of targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeTemplate {
    /// Source vertex model.
    pub source: ModelId,
    /// Vertex models this rule can connect to.
    pub targets: Vec<ModelId>,
    /// Edge model applied on connection.
    pub edge_model: ModelId,
    /// No connection beyond this Euclidean distance.
    pub cutoff: f64,
    /// Probability terms, summed to the connection threshold.
    pub terms: Vec<ProbabilityTerm>,
}

impl EdgeTemplate {
    /// Connection threshold at the given distance.
    pub fn threshold(&self, distance: f64) -> f64 {
        self.terms.iter().map(|t| t.evaluate(distance)).sum()
    }
}

/// Errors caught while building the catalog.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelValidationError {
    #[error("duplicate model name {name:?}")]
    DuplicateModelName { name: String },

    #[error("model name \"none\" is reserved for the sentinel")]
    ReservedModelName,

    #[error("{generator} generator is distance-dependent and not valid for vertex model {name:?}")]
    DistanceGeneratorOnVertex {
        name: String,
        generator: &'static str,
    },

    #[error("edge template references unknown model {model}")]
    UnknownModel { model: ModelId },

    #[error("edge template endpoint {model} is not a vertex model")]
    NotAVertexModel { model: ModelId },

    #[error("edge template applies {model}, which is not an edge model")]
    NotAnEdgeModel { model: ModelId },

    #[error("edge template for ({source}, {target}) is already defined")]
    DuplicateEdgeTemplate { source: ModelId, target: ModelId },
}

/// Validated, immutable model catalog.
///
/// Holds every vertex/edge model plus the connection templates. Model ids
/// are 1-based positions in declaration order; name `"none"` maps to the
/// id-0 sentinel.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<Model>,
    names: IndexMap<String, ModelId>,
    templates: Vec<EdgeTemplate>,
    by_pair: HashMap<(ModelId, ModelId), usize>,
}

impl ModelCatalog {
    /// Build and validate a catalog.
    pub fn new(
        models: Vec<Model>,
        templates: Vec<EdgeTemplate>,
    ) -> Result<Self, ModelValidationError> {
        let mut names = IndexMap::with_capacity(models.len() + 1);
        names.insert("none".to_string(), ModelId::NONE);

        for (i, model) in models.iter().enumerate() {
            if model.name == "none" {
                return Err(ModelValidationError::ReservedModelName);
            }
            let id = ModelId(i as u32 + 1);
            if names.insert(model.name.clone(), id).is_some() {
                return Err(ModelValidationError::DuplicateModelName {
                    name: model.name.clone(),
                });
            }
            if model.kind == ModelKind::Vertex {
                for generator in model.state.iter().chain(model.ticks.iter()) {
                    if generator.needs_distance() {
                        return Err(ModelValidationError::DistanceGeneratorOnVertex {
                            name: model.name.clone(),
                            generator: generator.name(),
                        });
                    }
                }
            }
        }

        let kind_of = |id: ModelId| -> Result<ModelKind, ModelValidationError> {
            if id.is_none() || id.index() > models.len() {
                return Err(ModelValidationError::UnknownModel { model: id });
            }
            Ok(models[id.index() - 1].kind)
        };

        let mut by_pair = HashMap::new();
        for (i, template) in templates.iter().enumerate() {
            if kind_of(template.source)? != ModelKind::Vertex {
                return Err(ModelValidationError::NotAVertexModel {
                    model: template.source,
                });
            }
            for &target in &template.targets {
                if kind_of(target)? != ModelKind::Vertex {
                    return Err(ModelValidationError::NotAVertexModel { model: target });
                }
                if by_pair.insert((template.source, target), i).is_some() {
                    return Err(ModelValidationError::DuplicateEdgeTemplate {
                        source: template.source,
                        target,
                    });
                }
            }
            // NONE is allowed here: the connection then carries no state.
            if !template.edge_model.is_none() && kind_of(template.edge_model)? != ModelKind::Edge {
                return Err(ModelValidationError::NotAnEdgeModel {
                    model: template.edge_model,
                });
            }
        }

        Ok(Self {
            models,
            names,
            templates,
            by_pair,
        })
    }

    /// Number of concrete models (the sentinel excluded).
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Look up a concrete model. `None` for the sentinel or out-of-range ids.
    pub fn model(&self, id: ModelId) -> Option<&Model> {
        if id.is_none() {
            return None;
        }
        self.models.get(id.index() - 1)
    }

    /// Model name for output; the sentinel renders as `"none"`.
    pub fn name_of(&self, id: ModelId) -> &str {
        self.model(id).map(|m| m.name.as_str()).unwrap_or("none")
    }

    /// Resolve a model name to its id.
    pub fn id_of(&self, name: &str) -> Option<ModelId> {
        self.names.get(name).copied()
    }

    /// The unique template for an ordered (source, target) pair, if any.
    pub fn template_for(&self, source: ModelId, target: ModelId) -> Option<&EdgeTemplate> {
        self.by_pair
            .get(&(source, target))
            .map(|&i| &self.templates[i])
    }

    /// All templates, in declaration order.
    pub fn templates(&self) -> &[EdgeTemplate] {
        &self.templates
    }

    fn checked(&self, id: ModelId, kind: ModelKind) -> Result<&Model, GenerationError> {
        if id.is_none() {
            return Err(GenerationError::NoneModel);
        }
        let model = self
            .model(id)
            .ok_or(GenerationError::UnknownModel { model: id })?;
        if model.kind != kind {
            return Err(GenerationError::KindMismatch {
                model: id,
                expected: match kind {
                    ModelKind::Vertex => "vertex",
                    ModelKind::Edge => "edge",
                },
            });
        }
        Ok(model)
    }

    /// Sample a vertex model's state vector.
    pub fn vertex_state<R: Rng + ?Sized>(
        &self,
        id: ModelId,
        rng: &mut R,
    ) -> Result<Vec<f64>, GenerationError> {
        let model = self.checked(id, ModelKind::Vertex)?;
        model.state.iter().map(|g| g.sample(rng, None)).collect()
    }

    /// Sample a vertex model's tick vector.
    pub fn vertex_ticks<R: Rng + ?Sized>(
        &self,
        id: ModelId,
        rng: &mut R,
    ) -> Result<Vec<Tick>, GenerationError> {
        let model = self.checked(id, ModelKind::Vertex)?;
        model
            .ticks
            .iter()
            .map(|g| g.sample(rng, None).map(Tick::from_ms))
            .collect()
    }

    /// Sample an edge model's state vector for a connection at `distance`.
    pub fn edge_state<R: Rng + ?Sized>(
        &self,
        id: ModelId,
        distance: f64,
        rng: &mut R,
    ) -> Result<Vec<f64>, GenerationError> {
        let model = self.checked(id, ModelKind::Edge)?;
        model
            .state
            .iter()
            .map(|g| g.sample(rng, Some(distance)))
            .collect()
    }

    /// Sample an edge model's tick vector for a connection at `distance`.
    pub fn edge_ticks<R: Rng + ?Sized>(
        &self,
        id: ModelId,
        distance: f64,
        rng: &mut R,
    ) -> Result<Vec<Tick>, GenerationError> {
        let model = self.checked(id, ModelKind::Edge)?;
        model
            .ticks
            .iter()
            .map(|g| g.sample(rng, Some(distance)).map(Tick::from_ms))
            .collect()
    }
}
