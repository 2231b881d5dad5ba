//! Partition-based vertex redistribution.

mod redistributor;

pub use redistributor::PartitionRedistributor;
