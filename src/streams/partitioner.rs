use crate::membership::types::Member;
use crate::membership::view::MemberView;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Maps a serialized key onto one of `num_partitions` partitions.
///
/// The router on the client side and the log on the producer side must use the
/// same implementation, otherwise lookups land on the wrong replica.
pub trait PartitionFinder: Send + Sync {
    fn partition_for(&self, serialized_key: &[u8], num_partitions: u32) -> u32;
}

/// The producer's default partitioner: murmur2 over the key bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Murmur2PartitionFinder;

impl PartitionFinder for Murmur2PartitionFinder {
    fn partition_for(&self, serialized_key: &[u8], num_partitions: u32) -> u32 {
        if num_partitions == 0 {
            return 0;
        }
        to_positive(murmur2(serialized_key)) as u32 % num_partitions
    }
}

/// 32-bit murmur2 with the seed and mixing constants used by Kafka producers.
pub fn murmur2(data: &[u8]) -> i32 {
    const SEED: u32 = 0x9747_b28c;
    const M: u32 = 0x5bd1_e995;
    const R: u32 = 24;

    let length = data.len();
    let mut h: u32 = SEED ^ (length as u32);

    let chunks = data.chunks_exact(4);
    let tail = chunks.remainder();
    for chunk in chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h = h.wrapping_mul(M);
        h ^= k;
    }

    if tail.len() >= 3 {
        h ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        h ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        h ^= tail[0] as u32;
        h = h.wrapping_mul(M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;

    h as i32
}

/// Clears the sign bit. Not `abs`: `i32::MIN` must stay non-negative.
pub fn to_positive(n: i32) -> i32 {
    n & 0x7fff_ffff
}

/// The partitions this replica holds, split by role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    pub active: BTreeSet<u32>,
    pub standby: BTreeSet<u32>,
}

impl Assignment {
    pub fn contains(&self, partition: u32) -> bool {
        self.active.contains(&partition) || self.standby.contains(&partition)
    }

    pub fn all(&self) -> BTreeSet<u32> {
        self.active.union(&self.standby).copied().collect()
    }
}

pub struct PartitionManager {
    num_partitions: u32,
    standby_replicas: usize,
    members: Arc<dyn MemberView>,
    finder: Arc<dyn PartitionFinder>,
}

impl PartitionManager {
    pub fn new(members: Arc<dyn MemberView>, num_partitions: u32, standby_replicas: usize) -> Self {
        Self {
            num_partitions,
            standby_replicas,
            members,
            finder: Arc::new(Murmur2PartitionFinder),
        }
    }

    pub fn with_finder(mut self, finder: Arc<dyn PartitionFinder>) -> Self {
        self.finder = finder;
        self
    }

    pub fn num_partitions(&self) -> u32 {
        self.num_partitions
    }

    pub fn finder(&self) -> Arc<dyn PartitionFinder> {
        self.finder.clone()
    }

    pub fn local_host(&self) -> String {
        self.members.local_member().host_info()
    }

    pub fn get_partition(&self, serialized_key: &[u8]) -> u32 {
        self.finder
            .partition_for(serialized_key, self.num_partitions)
    }

    /// Owners of `partition`: the active member first, then its standbys.
    pub fn get_owners(&self, partition: u32) -> Vec<Member> {
        let mut alive = self.members.alive_members();
        if alive.is_empty() {
            return vec![];
        }
        alive.sort_by(|a, b| a.id.cmp(&b.id));
        alive.dedup_by(|a, b| a.id == b.id);

        let copies = (1 + self.standby_replicas).min(alive.len());
        (0..copies)
            .map(|offset| alive[(partition as usize + offset) % alive.len()].clone())
            .collect()
    }

    /// Owner host infos for every partition, active first.
    pub fn owner_table(&self) -> BTreeMap<u32, Vec<String>> {
        (0..self.num_partitions)
            .map(|partition| {
                let hosts = self
                    .get_owners(partition)
                    .iter()
                    .map(Member::host_info)
                    .collect();
                (partition, hosts)
            })
            .collect()
    }

    pub fn local_assignment(&self) -> Assignment {
        let my_id = self.members.local_member().id;
        let mut assignment = Assignment::default();

        for partition in 0..self.num_partitions {
            let owners = self.get_owners(partition);
            match owners.iter().position(|m| m.id == my_id) {
                Some(0) => {
                    assignment.active.insert(partition);
                }
                Some(_) => {
                    assignment.standby.insert(partition);
                }
                None => {}
            }
        }

        assignment
    }
}
