//! Stochastic field generators.
//!
//! Every state and tick field of a model is produced by one generator.
//! The `Linear*` family maps a connection distance through an affine
//! function and is only meaningful for edge models; the rest draw from
//! the worker's random stream.

use crate::ModelId;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while sampling model fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// A distance-dependent generator was evaluated without a distance
    /// (i.e. in a vertex context).
    #[error("{generator} generator requires a connection distance")]
    DistanceRequired { generator: &'static str },

    /// The reserved "none" sentinel was used where a concrete model is
    /// required.
    #[error("the reserved \"none\" model cannot be sampled")]
    NoneModel,

    /// A model id that the catalog does not know.
    #[error("unknown model {model}")]
    UnknownModel { model: ModelId },

    /// A vertex was asked of an edge model, or vice versa.
    #[error("model {model} is not a {expected} model")]
    KindMismatch {
        model: ModelId,
        expected: &'static str,
    },
}

/// A stochastic field generator.
///
/// The set is closed: adding a variant forces every match site to handle
/// it, so there is no "unknown generator" failure mode at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Generator {
    /// Always `value`.
    Const { value: f64 },
    /// Uniform on `[lo, hi)`.
    Uniform { lo: f64, hi: f64 },
    /// Normal with the given mean and standard deviation.
    Normal { mean: f64, std: f64 },
    /// Normal with the standard deviate clamped to `±|bound|` before scaling.
    BoundedNormal { mean: f64, std: f64, bound: f64 },
    /// `distance * scale + offset`. Edge models only.
    Linear { scale: f64, offset: f64 },
    /// Linear, except values below `min` collapse to `floor`. Edge models only.
    LowerBoundedLinear {
        scale: f64,
        offset: f64,
        min: f64,
        floor: f64,
    },
    /// Linear clamped to `[min, max]`. Edge models only.
    BoundedLinear {
        scale: f64,
        offset: f64,
        min: f64,
        max: f64,
    },
}

impl Generator {
    /// Human-readable generator name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Generator::Const { .. } => "constant",
            Generator::Uniform { .. } => "uniform",
            Generator::Normal { .. } => "normal",
            Generator::BoundedNormal { .. } => "bounded normal",
            Generator::Linear { .. } => "linear",
            Generator::LowerBoundedLinear { .. } => "lower bounded linear",
            Generator::BoundedLinear { .. } => "bounded linear",
        }
    }

    /// Whether sampling requires a connection distance.
    pub fn needs_distance(&self) -> bool {
        matches!(
            self,
            Generator::Linear { .. }
                | Generator::LowerBoundedLinear { .. }
                | Generator::BoundedLinear { .. }
        )
    }

    /// Draw one value.
    ///
    /// `distance` must be provided for the `Linear*` family; passing it to
    /// the other variants is harmless and ignored.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        distance: Option<f64>,
    ) -> Result<f64, GenerationError> {
        match *self {
            Generator::Const { value } => Ok(value),
            Generator::Uniform { lo, hi } => Ok(lo + (hi - lo) * rng.gen::<f64>()),
            Generator::Normal { mean, std } => {
                let n: f64 = rng.sample(StandardNormal);
                Ok(mean + std.abs() * n)
            }
            Generator::BoundedNormal { mean, std, bound } => {
                let n: f64 = rng.sample(StandardNormal);
                let b = bound.abs();
                Ok(mean + std.abs() * n.clamp(-b, b))
            }
            Generator::Linear { scale, offset } => {
                let d = self.require_distance(distance)?;
                Ok(d * scale + offset)
            }
            Generator::LowerBoundedLinear {
                scale,
                offset,
                min,
                floor,
            } => {
                let d = self.require_distance(distance)?;
                let value = d * scale + offset;
                Ok(if value < min { floor } else { value })
            }
            Generator::BoundedLinear {
                scale,
                offset,
                min,
                max,
            } => {
                let d = self.require_distance(distance)?;
                Ok((d * scale + offset).clamp(min, max))
            }
        }
    }

    fn require_distance(&self, distance: Option<f64>) -> Result<f64, GenerationError> {
        distance.ok_or(GenerationError::DistanceRequired {
            generator: self.name(),
        })
    }
}
