//! Cross-worker messages for the construction protocol.

mod codec;
mod conn;
mod order;
mod partition;
pub mod wire;

// Re-export commonly used types
pub use codec::{decode_message, encode_message, CodecError, WireMessage};
pub use conn::{AdjacencyBatch, CachedEdge, ConnRequest, NeighborBatch};
pub use order::{RenumberEntry, RenumberMap};
pub use partition::{PartitionBatch, VertexRecord};
