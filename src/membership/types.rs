use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Instant;

/// Stable identity of a replica. Assignment orders members by it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum MemberState {
    Alive,
    Suspect,
    Dead,
}

/// One mirror replica as seen by the membership protocol.
///
/// Peers gossip on `gossip_addr`; queries and proxied reads go to `http_addr`, which is
/// also what the partition map publishes. `incarnation` only ever grows and lets a
/// replica refute rumours about itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub gossip_addr: SocketAddr,
    pub http_addr: SocketAddr,
    pub state: MemberState,
    pub incarnation: u64,

    #[serde(skip)]
    pub last_seen: Option<Instant>,
}

impl Member {
    /// A freshly started replica that takes part in gossip.
    pub fn gossiping(gossip_addr: SocketAddr, http_addr: SocketAddr) -> Self {
        Self {
            id: MemberId::new(),
            gossip_addr,
            http_addr,
            state: MemberState::Alive,
            incarnation: 1,
            last_seen: Some(Instant::now()),
        }
    }

    /// A member that only exists for static assignments and never gossips.
    pub fn fixed(id: impl Into<String>, http_addr: SocketAddr) -> Self {
        Self {
            id: MemberId(id.into()),
            gossip_addr: http_addr,
            http_addr,
            state: MemberState::Alive,
            incarnation: 1,
            last_seen: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state == MemberState::Alive
    }

    /// The `host:port` form published in the partition map.
    pub fn host_info(&self) -> String {
        self.http_addr.to_string()
    }
}

/// Datagrams exchanged between replicas (bincode on UDP).
///
/// A ping is answered with an ack carrying the sender's member list; joins go to
/// the seeds; suspect and alive spread health changes, tagged with the incarnation
/// they refer to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GossipMessage {
    Ping { from: MemberId, incarnation: u64 },
    Ack { from: MemberId, incarnation: u64, members: Vec<Member> },
    Join { member: Member },
    Suspect { member_id: MemberId, incarnation: u64 },
    Alive { member_id: MemberId, incarnation: u64 },
}
