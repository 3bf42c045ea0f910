use super::partitioner::{Assignment, PartitionManager};
use super::store::KeyValueStore;
use crate::error::{MirrorError, Result};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Lifecycle of the local stream-processing runtime.
///
/// Stores may only be queried while `Running`. `Created` and `Rebalancing` are
/// transient and reported as retryable; `NotRunning` is terminal for this replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Created,
    Rebalancing,
    Running,
    NotRunning,
}

/// Who serves a key right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyQueryMetadata {
    pub partition: u32,
    pub active: String,
    pub standbys: Vec<String>,
}

impl KeyQueryMetadata {
    pub fn is_hosted_on(&self, host: &str) -> bool {
        self.active == host || self.standbys.iter().any(|s| s == host)
    }
}

/// Local state of one partition: the point store, its range index and the
/// bookkeeping needed to resume consumption.
#[derive(Debug)]
pub struct PartitionShard {
    pub partition: u32,
    pub point: KeyValueStore<Vec<u8>>,
    pub range: KeyValueStore<String>,
    /// Last insert time per key, for retention.
    pub(crate) inserted: DashMap<Vec<u8>, u64>,
    offset: AtomicUsize,
    restored: AtomicBool,
}

impl PartitionShard {
    pub fn new(partition: u32) -> Self {
        Self {
            partition,
            point: KeyValueStore::new(),
            range: KeyValueStore::new(),
            inserted: DashMap::new(),
            offset: AtomicUsize::new(0),
            restored: AtomicBool::new(false),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset.load(Ordering::Acquire)
    }

    pub fn advance_to(&self, offset: usize) {
        self.offset.store(offset, Ordering::Release);
    }

    pub fn is_restored(&self) -> bool {
        self.restored.load(Ordering::Acquire)
    }

    pub fn mark_restored(&self) {
        self.restored.store(true, Ordering::Release);
    }
}

pub struct StreamsRuntime {
    local_host: String,
    partitions: Arc<PartitionManager>,
    state: RwLock<RuntimeState>,
    shards: DashMap<u32, Arc<PartitionShard>>,
    assignment: RwLock<Assignment>,
    owners: RwLock<Arc<BTreeMap<u32, Vec<String>>>>,
}

impl StreamsRuntime {
    pub fn new(partitions: Arc<PartitionManager>) -> Self {
        Self {
            local_host: partitions.local_host(),
            partitions,
            state: RwLock::new(RuntimeState::Created),
            shards: DashMap::new(),
            assignment: RwLock::new(Assignment::default()),
            owners: RwLock::new(Arc::new(BTreeMap::new())),
        }
    }

    pub fn local_host(&self) -> &str {
        &self.local_host
    }

    pub fn partition_manager(&self) -> Arc<PartitionManager> {
        self.partitions.clone()
    }

    pub fn state(&self) -> Result<RuntimeState> {
        Ok(*self.state.read()?)
    }

    fn set_state(&self, next: RuntimeState) -> Result<()> {
        let mut state = self.state.write()?;
        if *state == RuntimeState::NotRunning {
            return Ok(());
        }
        if *state != next {
            tracing::info!("Runtime state {:?} -> {:?}", *state, next);
            *state = next;
        }
        Ok(())
    }

    pub fn begin_rebalance(&self) -> Result<()> {
        self.set_state(RuntimeState::Rebalancing)
    }

    pub fn finish_rebalance(&self) -> Result<()> {
        self.set_state(RuntimeState::Running)
    }

    pub fn stop(&self) -> Result<()> {
        tracing::info!("Stopping stream runtime");
        *self.state.write()? = RuntimeState::NotRunning;
        Ok(())
    }

    pub fn current_assignment(&self) -> Result<Assignment> {
        Ok(self.assignment.read()?.clone())
    }

    /// Installs a new assignment. Revoked shards are dropped; newly assigned ones are
    /// created empty and unrestored. Returns the partitions that need a restore.
    pub fn apply_assignment(
        &self,
        assignment: Assignment,
        owners: BTreeMap<u32, Vec<String>>,
    ) -> Result<Vec<u32>> {
        let wanted = assignment.all();

        let revoked: Vec<u32> = self
            .shards
            .iter()
            .map(|e| *e.key())
            .filter(|p| !wanted.contains(p))
            .collect();
        for partition in revoked.iter() {
            self.shards.remove(partition);
        }

        let mut added = Vec::new();
        for partition in wanted {
            if !self.shards.contains_key(&partition) {
                self.shards
                    .insert(partition, Arc::new(PartitionShard::new(partition)));
                added.push(partition);
            }
        }

        tracing::info!(
            "Assignment applied: active={:?} standby={:?} revoked={:?} added={:?}",
            assignment.active,
            assignment.standby,
            revoked,
            added
        );

        *self.assignment.write()? = assignment;
        *self.owners.write()? = Arc::new(owners);
        Ok(added)
    }

    pub fn owners(&self) -> Result<Arc<BTreeMap<u32, Vec<String>>>> {
        Ok(self.owners.read()?.clone())
    }

    pub fn shard(&self, partition: u32) -> Option<Arc<PartitionShard>> {
        self.shards.get(&partition).map(|e| e.value().clone())
    }

    pub fn shards(&self) -> Vec<Arc<PartitionShard>> {
        let mut shards: Vec<Arc<PartitionShard>> =
            self.shards.iter().map(|e| e.value().clone()).collect();
        shards.sort_by_key(|s| s.partition);
        shards
    }

    fn ensure_running(&self) -> Result<()> {
        match self.state()? {
            RuntimeState::Running => Ok(()),
            RuntimeState::NotRunning => Err(MirrorError::StoreNotRunning),
            RuntimeState::Created | RuntimeState::Rebalancing => {
                Err(MirrorError::StoreNotAvailable)
            }
        }
    }

    pub fn query_metadata_for_key(&self, serialized_key: &[u8]) -> Result<KeyQueryMetadata> {
        self.ensure_running()?;

        let partition = self.partitions.get_partition(serialized_key);
        let owners = self.owners.read()?.clone();
        let hosts = owners
            .get(&partition)
            .filter(|hosts| !hosts.is_empty())
            .ok_or(MirrorError::StoreNotAvailable)?;

        Ok(KeyQueryMetadata {
            partition,
            active: hosts[0].clone(),
            standbys: hosts[1..].to_vec(),
        })
    }

    fn readable_shard(&self, partition: u32) -> Result<Arc<PartitionShard>> {
        self.ensure_running()?;
        match self.shard(partition) {
            Some(shard) if shard.is_restored() => Ok(shard),
            _ => Err(MirrorError::StoreNotAvailable),
        }
    }

    pub fn read_point(&self, partition: u32, serialized_key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.readable_shard(partition)?
            .point
            .get(&serialized_key.to_vec())
    }

    pub fn read_range(&self, partition: u32, from: &String, to: &String) -> Result<Vec<Vec<u8>>> {
        self.readable_shard(partition)?.range.range(from, to)
    }

    /// Every value of the partitions this replica is active for.
    pub fn read_all_active(&self) -> Result<Vec<Vec<u8>>> {
        self.ensure_running()?;
        let active = self.current_assignment()?.active;

        let mut values = Vec::new();
        for partition in active {
            let shard = self.readable_shard(partition)?;
            values.extend(shard.point.all()?.into_iter().map(|(_, v)| v));
        }
        Ok(values)
    }

    /// The partition-map document: partition id to the active `host:port`.
    pub fn partition_map(&self) -> Result<BTreeMap<u32, String>> {
        let owners = self.owners.read()?.clone();
        Ok(owners
            .iter()
            .filter_map(|(p, hosts)| hosts.first().map(|h| (*p, h.clone())))
            .collect())
    }
}
