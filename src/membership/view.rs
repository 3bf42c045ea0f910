use super::types::Member;
use std::sync::RwLock;

/// What partition assignment needs to know about the cluster.
pub trait MemberView: Send + Sync {
    fn local_member(&self) -> Member;

    fn alive_members(&self) -> Vec<Member>;
}

/// A fixed member list, for deployments without gossip and for tests.
///
/// The list can be replaced to simulate replicas joining or leaving.
pub struct StaticMembership {
    local: Member,
    members: RwLock<Vec<Member>>,
}

impl StaticMembership {
    pub fn new(local: Member, peers: Vec<Member>) -> Self {
        let mut members = vec![local.clone()];
        members.extend(peers.into_iter().filter(|p| p.id != local.id));
        Self {
            local,
            members: RwLock::new(members),
        }
    }

    pub fn set_members(&self, members: Vec<Member>) {
        match self.members.write() {
            Ok(mut guard) => *guard = members,
            Err(poisoned) => *poisoned.into_inner() = members,
        }
    }
}

impl MemberView for StaticMembership {
    fn local_member(&self) -> Member {
        self.local.clone()
    }

    fn alive_members(&self) -> Vec<Member> {
        match self.members.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
