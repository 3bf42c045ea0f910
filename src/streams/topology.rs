use super::log::{PartitionedLog, Record, now_ms};
use super::runtime::{PartitionShard, RuntimeState, StreamsRuntime};
use crate::codec::value::ValueCodec;
use crate::codec::{Codec, TopicData, WriteType};
use crate::error::Result;
use crate::range::indexer::WriteRangeIndexer;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Folds the partitioned log into the runtime's stores.
///
/// Each step reconciles the assignment with the current membership, catches every
/// local shard up with its partition and, when a retention time is configured,
/// periodically expires old keys.
pub struct Topology<K> {
    topic: TopicData,
    runtime: Arc<StreamsRuntime>,
    log: Arc<PartitionedLog>,
    key_codec: Arc<dyn Codec<Item = K>>,
    value_codec: ValueCodec,
    range_indexer: Option<WriteRangeIndexer<K>>,
    last_sweep: Mutex<Instant>,
}

impl<K> Topology<K>
where
    K: Send + Sync + 'static,
{
    pub fn new(
        topic: TopicData,
        runtime: Arc<StreamsRuntime>,
        log: Arc<PartitionedLog>,
        key_codec: Arc<dyn Codec<Item = K>>,
    ) -> Self {
        let value_codec = ValueCodec::new(topic.value_type);
        Self {
            topic,
            runtime,
            log,
            key_codec,
            value_codec,
            range_indexer: None,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    pub fn with_range_indexer(mut self, indexer: WriteRangeIndexer<K>) -> Self {
        self.range_indexer = Some(indexer);
        self
    }

    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tracing::info!("Starting topology for topic {}", self.topic.name);
        tokio::spawn(self.run())
    }

    async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(POLL_INTERVAL);

        loop {
            interval.tick().await;

            if matches!(self.runtime.state(), Ok(RuntimeState::NotRunning)) {
                tracing::info!("Runtime stopped, topology for {} exits", self.topic.name);
                return;
            }
            if let Err(e) = self.step() {
                tracing::error!("Topology step failed: {}", e);
            }
        }
    }

    /// One reconciliation round. Exposed for deterministic tests.
    pub fn step(&self) -> Result<()> {
        if self.runtime.state()? == RuntimeState::NotRunning {
            return Ok(());
        }

        self.rebalance_if_needed()?;

        for shard in self.runtime.shards() {
            self.catch_up(&shard);
        }

        if self.topic.retention.is_some() {
            let due = {
                let mut last = self.last_sweep.lock()?;
                if last.elapsed() >= RETENTION_SWEEP_INTERVAL {
                    *last = Instant::now();
                    true
                } else {
                    false
                }
            };
            if due {
                self.sweep_retention_at(now_ms())?;
            }
        }

        Ok(())
    }

    fn rebalance_if_needed(&self) -> Result<()> {
        let partitions = self.runtime.partition_manager();
        let desired = partitions.local_assignment();
        let owners = partitions.owner_table();

        let unchanged = self.runtime.state()? == RuntimeState::Running
            && self.runtime.current_assignment()? == desired
            && *self.runtime.owners()? == owners;
        if unchanged {
            return Ok(());
        }

        self.runtime.begin_rebalance()?;
        let added = self.runtime.apply_assignment(desired, owners)?;

        for partition in added {
            if let Some(shard) = self.runtime.shard(partition) {
                self.catch_up(&shard);
                tracing::info!(
                    "Restored partition {} ({} keys)",
                    partition,
                    shard.point.len()?
                );
            }
        }

        self.runtime.finish_rebalance()
    }

    fn catch_up(&self, shard: &PartitionShard) {
        let records = self.log.read_from(shard.partition, shard.offset());

        for record in records.iter() {
            if let Err(e) = self.process(shard, record) {
                tracing::warn!(
                    "Skipping record at {}/{}: {}",
                    shard.partition,
                    record.offset,
                    e
                );
            }
            shard.advance_to(record.offset + 1);
        }

        if !shard.is_restored() {
            shard.mark_restored();
        }
    }

    fn process(&self, shard: &PartitionShard, record: &Record) -> Result<()> {
        let Some(bytes) = &record.value else {
            shard.point.delete(&record.key)?;
            shard.inserted.remove(&record.key);
            if let Some(indexer) = &self.range_indexer {
                let key = self.key_codec.decode(&record.key)?;
                shard.range.remove_prefix(&indexer.key_prefix(&key))?;
            }
            return Ok(());
        };

        if self.topic.write_type == WriteType::Immutable && shard.point.contains(&record.key)? {
            tracing::debug!("Ignoring update of immutable key in partition {}", shard.partition);
            return Ok(());
        }

        if let Some(indexer) = &self.range_indexer {
            let key = self.key_codec.decode(&record.key)?;
            let value = self.value_codec.decode(bytes)?;
            let index = indexer.create_index(&key, &value)?;
            shard.range.put(index, bytes.clone())?;
        }

        shard.point.put(record.key.clone(), bytes.clone())?;
        if self.topic.retention.is_some() {
            shard.inserted.insert(record.key.clone(), record.timestamp_ms);
        }
        Ok(())
    }

    /// Deletes every key whose last insert is older than the retention time.
    pub fn sweep_retention_at(&self, now_ms: u64) -> Result<usize> {
        let Some(retention) = self.topic.retention else {
            return Ok(0);
        };
        let cutoff = now_ms.saturating_sub(retention.as_millis() as u64);
        let mut expired_total = 0;

        for shard in self.runtime.shards() {
            let expired: Vec<Vec<u8>> = shard
                .inserted
                .iter()
                .filter(|e| *e.value() < cutoff)
                .map(|e| e.key().clone())
                .collect();

            for key in expired.iter() {
                shard.point.delete(key)?;
                shard.inserted.remove(key);
                if let Some(indexer) = &self.range_indexer {
                    let decoded = self.key_codec.decode(key)?;
                    shard.range.remove_prefix(&indexer.key_prefix(&decoded))?;
                }
            }
            expired_total += expired.len();
        }

        if expired_total > 0 {
            tracing::info!("Retention removed {} key(s)", expired_total);
        }
        Ok(expired_total)
    }
}
