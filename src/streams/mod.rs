//! Stream Processing Module
//!
//! An in-process stand-in for the stream-processing runtime the query layer relies on.
//! Records are appended to a partitioned log; a topology folds them into per-partition
//! stores on every replica that is active or standby for the partition.
//!
//! ## Core Concepts
//! - **Partitioning**: `PartitionFinder` places keys; murmur2 matches the producers' default.
//! - **Placement**: `PartitionManager` derives active and standby partitions from membership.
//! - **Runtime**: `StreamsRuntime` owns the stores and answers key metadata queries.
//! - **Topology**: `Topology` restores, updates and expires the stores from the log.

pub mod log;
pub mod partitioner;
pub mod producer;
pub mod runtime;
pub mod store;
pub mod topology;
