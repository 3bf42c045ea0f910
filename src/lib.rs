//! Mirror Mesh Library
//!
//! Partitioned, replicated key-value state served as point- and range-queryable mirrors,
//! reachable directly or through a partition-aware client.
//!
//! ## Architecture Modules
//!
//! - **`membership`**: Replica discovery via UDP gossip (SWIM-like), or a static member list.
//! - **`streams`**: The in-process stream runtime: partitioned log, partition assignment,
//!   per-partition stores and the topology that fills them.
//! - **`range`**: Order-preserving composite keys that turn an ordered store into a range index.
//! - **`query`**: The mirror's HTTP surface and the local-or-proxy query service behind it.
//! - **`client`**: Host addressing, the partition router and the mirror clients with their
//!   fallback protocol.
//! - **`codec`**: Key and value codecs chosen per topic.
//! - **`config`**: Command-line/environment configuration of a replica.
//! - **`error`**: The shared error taxonomy.

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod membership;
pub mod query;
pub mod range;
pub mod streams;
