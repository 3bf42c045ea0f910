//! Membership & Discovery Module
//!
//! Implements a Gossip-based membership protocol (inspired by SWIM) so mirror replicas can find
//! each other without a coordinator. The alive member set is the input of partition assignment.
//!
//! ## Core Mechanisms
//! - **Gossip Protocol**: Replicas periodically exchange status updates via UDP.
//! - **Failure Detection**: "Suspect" -> "Dead" transitions with timeouts.
//! - **Incarnation Numbers**: Resolve disputes about a replica's state.
//! - **Static View**: A fixed member list for deployments and tests that do not gossip.

pub mod service;
pub mod types;
pub mod view;
