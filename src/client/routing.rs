use super::host::MirrorHost;
use crate::codec::Codec;
use crate::error::{MirrorError, Result};
use crate::streams::partitioner::PartitionFinder;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// Resolves keys to the mirror instance serving them.
#[async_trait]
pub trait Router<K>: Send + Sync {
    fn find_host(&self, key: &K) -> Result<MirrorHost>;

    /// Every distinct host currently known.
    fn all_hosts(&self) -> Result<Vec<MirrorHost>>;

    /// Replaces the routing information with a freshly fetched partition map.
    async fn update_routing_info(&self) -> Result<()>;
}

/// An immutable partition to host mapping.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    partitions: HashMap<u32, MirrorHost>,
    num_partitions: u32,
}

impl RoutingTable {
    /// Builds a table from a partition-map document. The partition count is one
    /// more than the highest partition id in the document, so a document missing
    /// the top partitions routes with a smaller count than the producer.
    pub fn from_document(document: &BTreeMap<u32, String>) -> Self {
        let partitions = document
            .iter()
            .map(|(p, host)| (*p, MirrorHost::direct(host.clone())))
            .collect();
        let num_partitions = document.keys().max().map(|p| p + 1).unwrap_or(0);
        let table = Self {
            partitions,
            num_partitions,
        };
        if !table.is_complete() {
            tracing::warn!(
                "Partition map lists {} of {} partitions; keys of the missing ones have no host",
                document.len(),
                num_partitions
            );
        }
        table
    }

    /// Whether every partition below the partition count has a host.
    pub fn is_complete(&self) -> bool {
        self.partitions.len() == self.num_partitions as usize
    }

    pub fn num_partitions(&self) -> u32 {
        self.num_partitions
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn host_for(&self, partition: u32) -> Option<&MirrorHost> {
        self.partitions.get(&partition)
    }

    pub fn hosts(&self) -> Vec<MirrorHost> {
        let mut hosts: Vec<MirrorHost> = Vec::new();
        let mut partitions: Vec<_> = self.partitions.iter().collect();
        partitions.sort_by_key(|(p, _)| **p);
        for (_, host) in partitions {
            if !hosts.contains(host) {
                hosts.push(host.clone());
            }
        }
        hosts
    }
}

/// Routes keys with the producer's partitioner over a partition map fetched from
/// the mirrors themselves.
///
/// The table is swapped as a whole on refresh; readers holding the previous
/// `Arc` keep a consistent view.
pub struct PartitionRouter<K> {
    topic: String,
    key_codec: Arc<dyn Codec<Item = K>>,
    finder: Arc<dyn PartitionFinder>,
    discovery: Option<MirrorHost>,
    http_client: reqwest::Client,
    table: RwLock<Arc<RoutingTable>>,
}

impl<K> PartitionRouter<K> {
    pub fn new(
        topic: impl Into<String>,
        key_codec: Arc<dyn Codec<Item = K>>,
        finder: Arc<dyn PartitionFinder>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            topic: topic.into(),
            key_codec,
            finder,
            discovery: None,
            http_client,
            table: RwLock::new(Arc::new(RoutingTable::default())),
        }
    }

    /// The host asked first for the partition map.
    pub fn with_discovery_host(mut self, host: MirrorHost) -> Self {
        self.discovery = Some(host);
        self
    }

    /// Seeds the table without a network round trip.
    pub fn with_mapping(self, document: &BTreeMap<u32, String>) -> Self {
        match self.table.write() {
            Ok(mut table) => *table = Arc::new(RoutingTable::from_document(document)),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(RoutingTable::from_document(document)),
        }
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn table(&self) -> Result<Arc<RoutingTable>> {
        Ok(self.table.read()?.clone())
    }

    async fn fetch_mapping(&self, host: &MirrorHost) -> Result<BTreeMap<u32, String>> {
        let url = host.partitions_url()?;
        let unreachable = |e: reqwest::Error| MirrorError::Unreachable {
            host: host.address(),
            reason: e.to_string(),
        };

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(unreachable)?;

        let status = response.status();
        let body = response.bytes().await.map_err(unreachable)?;
        if !status.is_success() {
            return Err(MirrorError::from_remote(status.as_u16(), &body));
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl<K> Router<K> for PartitionRouter<K>
where
    K: Send + Sync,
{
    fn find_host(&self, key: &K) -> Result<MirrorHost> {
        let table = self.table()?;
        if table.is_empty() {
            return Err(MirrorError::RouterNotInitialized);
        }

        let serialized = self.key_codec.encode(key)?;
        let partition = self
            .finder
            .partition_for(&serialized, table.num_partitions());

        table
            .host_for(partition)
            .cloned()
            .ok_or(MirrorError::NoHostForPartition(partition))
    }

    fn all_hosts(&self) -> Result<Vec<MirrorHost>> {
        Ok(self.table()?.hosts())
    }

    async fn update_routing_info(&self) -> Result<()> {
        let mut candidates: Vec<MirrorHost> = self.discovery.iter().cloned().collect();
        for host in self.all_hosts()? {
            if !candidates.contains(&host) {
                candidates.push(host);
            }
        }

        let mut last_error = MirrorError::RouterNotInitialized;
        for host in candidates.iter() {
            match self.fetch_mapping(host).await {
                Ok(document) => {
                    let table = RoutingTable::from_document(&document);
                    tracing::info!(
                        "Routing for {} updated from {}: {} partition(s), {} host(s)",
                        self.topic,
                        host,
                        document.len(),
                        table.hosts().len()
                    );
                    *self.table.write()? = Arc::new(table);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch partition map from {}: {}", host, e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}
