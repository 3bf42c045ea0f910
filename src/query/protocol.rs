//! Mirror Network Protocol
//!
//! Paths, the stale-mapping header and the response envelope shared by the mirrors
//! and their clients.

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Full scan of the values this mirror is active for.
pub const ENDPOINT_MIRROR: &str = "/mirror";
/// Point lookup.
pub const ENDPOINT_MIRROR_KEY: &str = "/mirror/:key";
/// Multi-key lookup, `?ids=k1,k2,...`.
pub const ENDPOINT_MIRROR_KEYS: &str = "/mirror/keys";
/// Range lookup, `?from=..&to=..`, inclusive.
pub const ENDPOINT_MIRROR_RANGE: &str = "/mirror/range/:key";
/// Partition-map document.
pub const ENDPOINT_PARTITIONS: &str = "/streams/partitions";
/// Point lookup proxied by another mirror, answered from the local stores only.
pub const ENDPOINT_INTERNAL_KEY: &str = "/internal/mirror/:key";
/// Range lookup proxied by another mirror, answered from the local stores only.
pub const ENDPOINT_INTERNAL_RANGE: &str = "/internal/mirror/range/:key";

// --- Headers ---

/// Set on responses that did not come from the caller's mapped owner.
/// Only its presence matters.
pub const UPDATE_PARTITION_HOST_MAPPING_HEADER: &str = "X-Cache-Update";
pub const HEADER_EXISTS: &str = "?1";

// --- Data Transfer Objects ---

/// Envelope of every successful mirror response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorValue<T> {
    pub value: T,
}

#[derive(Debug, Deserialize)]
pub struct ManyParams {
    /// Comma separated key texts. A key containing a comma cannot be part of a batch.
    pub ids: String,
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub from: String,
    pub to: String,
}
