//! Connection tests and edge attribute sampling.

use neurograph_types::{
    AdjacencyEntry, GenerationError, GlobalVertexId, ModelCatalog, ModelId,
};
use rand::Rng;

/// Decide whether a directed edge source → target exists at `distance`.
///
/// Locates the unique edge template for the ordered model pair; no
/// template or a distance beyond the cutoff means no possible connection
/// (and consumes no randomness). Otherwise one uniform draw is compared
/// against the summed probability threshold. Returns the template's edge
/// model on connection, `NONE` otherwise.
pub fn make_connection<R: Rng + ?Sized>(
    catalog: &ModelCatalog,
    source: ModelId,
    target: ModelId,
    distance: f64,
    rng: &mut R,
) -> ModelId {
    let Some(template) = catalog.template_for(source, target) else {
        return ModelId::NONE;
    };
    if distance > template.cutoff {
        return ModelId::NONE;
    }
    let threshold = template.threshold(distance);
    if rng.gen::<f64>() < threshold {
        template.edge_model
    } else {
        ModelId::NONE
    }
}

/// Build the adjacency entry recording the edge peer → self.
///
/// A `NONE` model yields a stateless stub; otherwise state and ticks are
/// sampled from the edge model at the endpoint distance.
pub fn edge_entry<R: Rng + ?Sized>(
    catalog: &ModelCatalog,
    peer: GlobalVertexId,
    model: ModelId,
    distance: f64,
    rng: &mut R,
) -> Result<AdjacencyEntry, GenerationError> {
    if model.is_none() {
        return Ok(AdjacencyEntry::stub(peer));
    }
    Ok(AdjacencyEntry {
        peer,
        edge_model: model,
        state: catalog.edge_state(model, distance, rng)?,
        ticks: catalog.edge_ticks(model, distance, rng)?,
    })
}
