use super::partitioner::PartitionFinder;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// One entry of a partition. `value == None` is a tombstone.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub offset: usize,
    pub key: Vec<u8>,
    pub value: Option<Vec<u8>>,
    pub timestamp_ms: u64,
}

/// An in-memory topic with a fixed partition count.
///
/// Records are placed with the same [`PartitionFinder`] the clients route with.
pub struct PartitionedLog {
    num_partitions: u32,
    finder: Arc<dyn PartitionFinder>,
    partitions: DashMap<u32, Vec<Record>>,
}

impl PartitionedLog {
    pub fn new(num_partitions: u32, finder: Arc<dyn PartitionFinder>) -> Self {
        let partitions = DashMap::new();
        for p in 0..num_partitions {
            partitions.insert(p, Vec::new());
        }
        Self {
            num_partitions,
            finder,
            partitions,
        }
    }

    pub fn num_partitions(&self) -> u32 {
        self.num_partitions
    }

    /// Appends a record and returns `(partition, offset)`.
    pub fn append(&self, key: Vec<u8>, value: Option<Vec<u8>>) -> (u32, usize) {
        self.append_at(key, value, now_ms())
    }

    pub fn append_at(&self, key: Vec<u8>, value: Option<Vec<u8>>, timestamp_ms: u64) -> (u32, usize) {
        let partition = self.finder.partition_for(&key, self.num_partitions);
        let mut records = self.partitions.entry(partition).or_default();
        let offset = records.len();
        records.push(Record {
            offset,
            key,
            value,
            timestamp_ms,
        });
        (partition, offset)
    }

    /// Records of `partition` starting at `offset`.
    pub fn read_from(&self, partition: u32, offset: usize) -> Vec<Record> {
        self.partitions
            .get(&partition)
            .map(|records| records.iter().skip(offset).cloned().collect())
            .unwrap_or_default()
    }

    pub fn end_offset(&self, partition: u32) -> usize {
        self.partitions
            .get(&partition)
            .map(|records| records.len())
            .unwrap_or(0)
    }
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
