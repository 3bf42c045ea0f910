//! Mirror Client Module
//!
//! The read side used by applications and by mirrors proxying to each other.
//!
//! ## Submodules
//! - **`host`**: URLs of a mirror's operations, with or without the service-name prefix.
//! - **`routing`**: `PartitionRouter` resolves keys to hosts from a partition map it refreshes on demand.
//! - **`request`**: One HTTP call per request, tagged primary or fallback.
//! - **`mirror`**: `DefaultMirrorClient` for a single host, `PartitionedMirrorClient` with the fallback protocol.

pub mod host;
pub mod mirror;
pub mod request;
pub mod routing;

#[cfg(test)]
mod tests;
