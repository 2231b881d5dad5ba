//! Message encoding and decoding.
//!
//! Messages are bincode-encoded and wrapped in the versioned frame from
//! [`wire`](crate::wire). The transport only sees opaque byte frames; the
//! message kind travels as the enum tag inside the payload.

use crate::{AdjacencyBatch, ConnRequest, NeighborBatch, PartitionBatch, RenumberMap, wire};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during message encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("frame of {len} bytes is shorter than the header")]
    FrameTooShort { len: usize },

    #[error("unsupported wire version {found}")]
    UnsupportedVersion { found: u8 },

    #[error("frame declares {declared} payload bytes but carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("encode error: {0}")]
    Encode(String),

    #[error("decode error: {0}")]
    Decode(String),
}

/// Tagged union of every record that crosses the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireMessage {
    ConnRequest(ConnRequest),
    NeighborBatch(NeighborBatch),
    AdjacencyBatch(AdjacencyBatch),
    PartitionBatch(PartitionBatch),
    RenumberMap(RenumberMap),
}

impl WireMessage {
    /// Get a human-readable name for this message type.
    pub fn type_name(&self) -> &'static str {
        match self {
            WireMessage::ConnRequest(_) => "ConnRequest",
            WireMessage::NeighborBatch(_) => "NeighborBatch",
            WireMessage::AdjacencyBatch(_) => "AdjacencyBatch",
            WireMessage::PartitionBatch(_) => "PartitionBatch",
            WireMessage::RenumberMap(_) => "RenumberMap",
        }
    }
}

/// Encode a message to a framed byte vector.
pub fn encode_message(message: &WireMessage) -> Result<Vec<u8>, CodecError> {
    let payload = bincode::serialize(message).map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(wire::frame(&payload))
}

/// Decode a framed byte vector back into a message.
pub fn decode_message(bytes: &[u8]) -> Result<WireMessage, CodecError> {
    let payload = wire::unframe(bytes)?;
    bincode::deserialize(payload).map_err(|e| CodecError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CachedEdge, RenumberEntry, VertexRecord};
    use neurograph_types::{
        AdjacencyEntry, GlobalVertexId, ModelId, PartitionId, Position, Tick, WorkerId,
    };

    fn roundtrip(message: WireMessage) {
        let bytes = encode_message(&message).unwrap();
        assert_eq!(decode_message(&bytes).unwrap(), message);
    }

    #[test]
    fn test_roundtrip_conn_request() {
        roundtrip(WireMessage::ConnRequest(ConnRequest { from: WorkerId(3) }));
    }

    #[test]
    fn test_roundtrip_neighbor_batch() {
        roundtrip(WireMessage::NeighborBatch(NeighborBatch {
            from: WorkerId(1),
            models: vec![ModelId(1), ModelId(2)],
            positions: vec![
                Position([0.5, -1.0, 0.0]),
                Position([1.0, 2.0, 3.0]),
            ],
        }));
    }

    #[test]
    fn test_roundtrip_adjacency_batch() {
        roundtrip(WireMessage::AdjacencyBatch(AdjacencyBatch {
            from: WorkerId(0),
            positions: vec![Position([0.0, 0.0, 0.0])],
            rows: vec![vec![
                CachedEdge {
                    target: 4,
                    model: ModelId(2),
                },
                CachedEdge {
                    target: 5,
                    model: ModelId::NONE,
                },
            ]],
        }));
    }

    #[test]
    fn test_roundtrip_partition_batch() {
        roundtrip(WireMessage::PartitionBatch(PartitionBatch {
            from: WorkerId(2),
            part: PartitionId(7),
            records: vec![VertexRecord {
                original_id: GlobalVertexId(11),
                model: ModelId(1),
                position: Position([1.0, 0.0, -2.0]),
                state: vec![0.25],
                ticks: vec![Tick(65536)],
                adjacency: vec![AdjacencyEntry {
                    peer: GlobalVertexId(3),
                    edge_model: ModelId(2),
                    state: vec![1.5],
                    ticks: vec![],
                }],
                events: vec![],
            }],
        }));
    }

    #[test]
    fn test_roundtrip_renumber_map() {
        roundtrip(WireMessage::RenumberMap(RenumberMap {
            from: WorkerId(1),
            entries: vec![
                RenumberEntry {
                    old: GlobalVertexId(9),
                    rank: 0,
                },
                RenumberEntry {
                    old: GlobalVertexId(2),
                    rank: 1,
                },
            ],
        }));
    }

    #[test]
    fn test_decode_rejects_garbage_payload() {
        let bytes = wire::frame(&[0xff; 3]);
        assert!(matches!(
            decode_message(&bytes),
            Err(CodecError::Decode(_))
        ));
    }
}
