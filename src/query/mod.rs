//! Query Service Module
//!
//! The server side of the mirror. Every replica answers every request: keys it holds
//! (as active or standby) are read locally, anything else is proxied to the active
//! replica and flagged so the caller refreshes its routing. Proxied requests land on
//! the `/internal` endpoints, which only read locally.
//!
//! ## Submodules
//! - **`protocol`**: Paths, the stale-mapping header and the `{ "value": .. }` envelope.
//! - **`service`**: `QueryService`, the local-or-proxy decision.
//! - **`handlers`**: axum handlers and the router exposing them.

pub mod handlers;
pub mod protocol;
pub mod service;
