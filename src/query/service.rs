use crate::client::host::MirrorHost;
use crate::client::mirror::decode_envelope;
use crate::client::request::{RequestManager, process_response};
use crate::codec::value::ValueCodec;
use crate::codec::{Codec, TopicData};
use crate::error::{MirrorError, Result};
use crate::range::indexer::ReadRangeIndexer;
use crate::streams::runtime::{KeyQueryMetadata, StreamsRuntime};
use futures::future::join_all;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A query result and whether the caller's routing for it is stale.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse<T> {
    pub value: T,
    pub stale_mapping: bool,
}

impl<T> QueryResponse<T> {
    fn local(value: T) -> Self {
        Self {
            value,
            stale_mapping: false,
        }
    }

    fn proxied(value: T) -> Self {
        Self {
            value,
            stale_mapping: true,
        }
    }
}

/// Answers mirror queries from the local stores, or through the replica the
/// runtime reports as active for the key.
///
/// A proxied request goes to the owner's internal endpoints, which never proxy
/// again: a replica that disagrees about ownership fails it as unavailable.
pub struct QueryService<K> {
    topic: TopicData,
    runtime: Arc<StreamsRuntime>,
    key_codec: Arc<dyn Codec<Item = K>>,
    value_codec: ValueCodec,
    range_reader: Option<ReadRangeIndexer<K>>,
    requests: Arc<dyn RequestManager>,
}

impl<K> QueryService<K>
where
    K: Send + Sync + 'static,
{
    pub fn new(
        topic: TopicData,
        runtime: Arc<StreamsRuntime>,
        key_codec: Arc<dyn Codec<Item = K>>,
        requests: Arc<dyn RequestManager>,
    ) -> Self {
        let value_codec = ValueCodec::new(topic.value_type);
        Self {
            topic,
            runtime,
            key_codec,
            value_codec,
            range_reader: None,
            requests,
        }
    }

    pub fn with_range_reader(mut self, reader: ReadRangeIndexer<K>) -> Self {
        self.range_reader = Some(reader);
        self
    }

    pub fn topic(&self) -> &TopicData {
        &self.topic
    }

    pub fn key_codec(&self) -> &dyn Codec<Item = K> {
        self.key_codec.as_ref()
    }

    fn metadata(&self, key: &K) -> Result<(Vec<u8>, KeyQueryMetadata)> {
        let serialized = self.key_codec.encode(key)?;
        let metadata = self.runtime.query_metadata_for_key(&serialized)?;
        Ok((serialized, metadata))
    }

    fn is_local(&self, metadata: &KeyQueryMetadata) -> bool {
        metadata.is_hosted_on(self.runtime.local_host())
    }

    fn owner(&self, metadata: &KeyQueryMetadata) -> MirrorHost {
        MirrorHost::direct(metadata.active.clone())
    }

    async fn proxy<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        let wrapper = self.requests.make_request(url).await?;
        process_response(&wrapper, decode_envelope)
    }

    fn read_local(&self, key: &K, serialized: &[u8], metadata: &KeyQueryMetadata) -> Result<Value> {
        let bytes = self
            .runtime
            .read_point(metadata.partition, serialized)?
            .ok_or_else(|| MirrorError::NotFound(self.key_codec.to_text(key)))?;
        self.value_codec.decode(&bytes)
    }

    fn read_range_local(
        &self,
        metadata: &KeyQueryMetadata,
        index_from: &String,
        index_to: &String,
    ) -> Result<Vec<Value>> {
        self.runtime
            .read_range(metadata.partition, index_from, index_to)?
            .iter()
            .map(|bytes| self.value_codec.decode(bytes))
            .collect()
    }

    fn not_held(&self, metadata: &KeyQueryMetadata) -> MirrorError {
        tracing::warn!(
            "Proxied request for partition {}, which this replica does not hold (active: {})",
            metadata.partition,
            metadata.active
        );
        MirrorError::StoreNotAvailable
    }

    pub async fn get(&self, key: &K) -> Result<QueryResponse<Value>> {
        let (serialized, metadata) = self.metadata(key)?;

        if self.is_local(&metadata) {
            return Ok(QueryResponse::local(self.read_local(key, &serialized, &metadata)?));
        }

        tracing::debug!(
            "Partition {} is served by {}, proxying",
            metadata.partition,
            metadata.active
        );
        let text = self.key_codec.to_text(key);
        let value = self
            .proxy(self.owner(&metadata).internal_key_url(&text)?)
            .await?
            .ok_or(MirrorError::NotFound(text))?;
        Ok(QueryResponse::proxied(value))
    }

    /// A point read proxied by another replica. Never proxies again.
    pub fn get_local(&self, key: &K) -> Result<QueryResponse<Value>> {
        let (serialized, metadata) = self.metadata(key)?;
        if !self.is_local(&metadata) {
            return Err(self.not_held(&metadata));
        }
        Ok(QueryResponse::local(self.read_local(key, &serialized, &metadata)?))
    }

    /// Values of the existing keys. The mapping is stale if any key was proxied.
    pub async fn get_many(&self, keys: &[K]) -> Result<QueryResponse<Vec<Value>>> {
        let results = join_all(keys.iter().map(|key| self.get(key))).await;

        let mut merged = QueryResponse::local(Vec::with_capacity(keys.len()));
        for result in results {
            match result {
                Ok(response) => {
                    merged.stale_mapping |= response.stale_mapping;
                    merged.value.push(response.value);
                }
                Err(MirrorError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(merged)
    }

    /// Every value of the partitions this replica is active for.
    pub fn get_all(&self) -> Result<QueryResponse<Vec<Value>>> {
        let values = self
            .runtime
            .read_all_active()?
            .iter()
            .map(|bytes| self.value_codec.decode(bytes))
            .collect::<Result<Vec<_>>>()?;
        Ok(QueryResponse::local(values))
    }

    fn range_bounds(&self, key: &K, from: &str, to: &str) -> Result<(String, String)> {
        let reader = self.range_reader.as_ref().ok_or_else(|| {
            MirrorError::BadArgument(format!("Topic {} has no range field", self.topic.name))
        })?;
        reader.bounds(key, from, to)
    }

    pub async fn get_range(&self, key: &K, from: &str, to: &str) -> Result<QueryResponse<Vec<Value>>> {
        let (index_from, index_to) = self.range_bounds(key, from, to)?;
        let (_, metadata) = self.metadata(key)?;

        if self.is_local(&metadata) {
            let values = self.read_range_local(&metadata, &index_from, &index_to)?;
            return Ok(QueryResponse::local(values));
        }

        tracing::debug!(
            "Range of partition {} is served by {}, proxying",
            metadata.partition,
            metadata.active
        );
        let url = self
            .owner(&metadata)
            .internal_range_url(&self.key_codec.to_text(key), from, to)?;
        let values = self.proxy(url).await?.unwrap_or_default();
        Ok(QueryResponse::proxied(values))
    }

    /// A range read proxied by another replica. Never proxies again.
    pub fn get_range_local(&self, key: &K, from: &str, to: &str) -> Result<QueryResponse<Vec<Value>>> {
        let (index_from, index_to) = self.range_bounds(key, from, to)?;
        let (_, metadata) = self.metadata(key)?;
        if !self.is_local(&metadata) {
            return Err(self.not_held(&metadata));
        }
        let values = self.read_range_local(&metadata, &index_from, &index_to)?;
        Ok(QueryResponse::local(values))
    }

    pub fn partition_map(&self) -> Result<BTreeMap<u32, String>> {
        self.runtime.partition_map()
    }
}
