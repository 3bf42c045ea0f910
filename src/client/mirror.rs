use super::host::MirrorHost;
use super::request::{RequestManager, ResponseWrapper, process_response};
use super::routing::Router;
use crate::codec::Codec;
use crate::error::{MirrorError, Result};
use crate::query::protocol::MirrorValue;
use async_trait::async_trait;
use futures::future::join_all;
use rand::seq::SliceRandom;
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// Read API of a mirror.
#[async_trait]
pub trait MirrorClient<K, V>: Send + Sync
where
    K: Send + Sync,
    V: Send,
{
    async fn get(&self, key: &K) -> Result<Option<V>>;

    /// Values of the keys that exist; missing keys are omitted. Order is not guaranteed.
    async fn get_many(&self, keys: &[K]) -> Result<Vec<V>>;

    async fn get_all(&self) -> Result<Vec<V>>;

    /// Values of `key` whose range field lies in `[from, to]`, ascending.
    async fn get_range(&self, key: &K, from: &str, to: &str) -> Result<Vec<V>>;

    async fn exists(&self, key: &K) -> bool {
        matches!(self.get(key).await, Ok(Some(_)))
    }
}

pub(crate) fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let envelope: MirrorValue<T> = serde_json::from_slice(body)?;
    Ok(envelope.value)
}

/// Whether a key text can travel in a `keys` batch. The mirror splits the batch on
/// commas, so keys containing one are fetched on their own.
fn batchable(text: &str) -> bool {
    !text.contains(',')
}

/// A client bound to a single mirror host.
pub struct DefaultMirrorClient<K, V> {
    host: MirrorHost,
    key_codec: Arc<dyn Codec<Item = K>>,
    requests: Arc<dyn RequestManager>,
    _value: PhantomData<fn() -> V>,
}

impl<K, V> DefaultMirrorClient<K, V> {
    pub fn new(
        host: MirrorHost,
        key_codec: Arc<dyn Codec<Item = K>>,
        requests: Arc<dyn RequestManager>,
    ) -> Self {
        Self {
            host,
            key_codec,
            requests,
            _value: PhantomData,
        }
    }

    pub fn host(&self) -> &MirrorHost {
        &self.host
    }
}

#[async_trait]
impl<K, V> MirrorClient<K, V> for DefaultMirrorClient<K, V>
where
    K: Send + Sync,
    V: DeserializeOwned + Send,
{
    async fn get(&self, key: &K) -> Result<Option<V>> {
        let url = self.host.key_url(&self.key_codec.to_text(key))?;
        let wrapper = self.requests.make_request(url).await?;
        process_response(&wrapper, decode_envelope)
    }

    async fn get_many(&self, keys: &[K]) -> Result<Vec<V>> {
        if keys.is_empty() {
            return Ok(vec![]);
        }
        let (ids, singles): (Vec<String>, Vec<String>) = keys
            .iter()
            .map(|k| self.key_codec.to_text(k))
            .partition(|text| batchable(text));

        let mut values = Vec::new();
        if !ids.is_empty() {
            let wrapper = self.requests.make_request(self.host.keys_url(&ids)?).await?;
            values.extend(process_response::<Vec<V>, _>(&wrapper, decode_envelope)?.unwrap_or_default());
        }
        for text in singles {
            let wrapper = self.requests.make_request(self.host.key_url(&text)?).await?;
            values.extend(process_response::<V, _>(&wrapper, decode_envelope)?);
        }
        Ok(values)
    }

    async fn get_all(&self) -> Result<Vec<V>> {
        let wrapper = self.requests.make_request(self.host.all_url()?).await?;
        Ok(process_response(&wrapper, decode_envelope)?.unwrap_or_default())
    }

    async fn get_range(&self, key: &K, from: &str, to: &str) -> Result<Vec<V>> {
        let url = self
            .host
            .range_url(&self.key_codec.to_text(key), from, to)?;
        let wrapper = self.requests.make_request(url).await?;
        Ok(process_response(&wrapper, decode_envelope)?.unwrap_or_default())
    }
}

/// A client routing every key to the mirror that owns its partition.
///
/// When the mapped host is unreachable the request is repeated once on another
/// host. Any response that came from a host other than the owner (a fallback, or a
/// proxied answer carrying the stale-mapping header) triggers one routing refresh
/// per call.
pub struct PartitionedMirrorClient<K, V> {
    key_codec: Arc<dyn Codec<Item = K>>,
    router: Arc<dyn Router<K>>,
    requests: Arc<dyn RequestManager>,
    fallback_host: Option<MirrorHost>,
    _value: PhantomData<fn() -> V>,
}

impl<K, V> PartitionedMirrorClient<K, V>
where
    K: Send + Sync,
    V: DeserializeOwned + Send,
{
    pub fn new(
        key_codec: Arc<dyn Codec<Item = K>>,
        router: Arc<dyn Router<K>>,
        requests: Arc<dyn RequestManager>,
    ) -> Self {
        Self {
            key_codec,
            router,
            requests,
            fallback_host: None,
            _value: PhantomData,
        }
    }

    /// A fixed host to retry on, instead of another replica from the routing table.
    pub fn with_fallback_host(mut self, host: MirrorHost) -> Self {
        self.fallback_host = Some(host);
        self
    }

    pub fn router(&self) -> Arc<dyn Router<K>> {
        self.router.clone()
    }

    fn fallback_for(&self, failed: &MirrorHost) -> Result<Option<MirrorHost>> {
        if let Some(host) = &self.fallback_host
            && host != failed
        {
            return Ok(Some(host.clone()));
        }

        let candidates: Vec<MirrorHost> = self
            .router
            .all_hosts()?
            .into_iter()
            .filter(|h| h != failed)
            .collect();
        Ok(candidates.choose(&mut rand::thread_rng()).cloned())
    }

    async fn request_with_fallback(
        &self,
        host: &MirrorHost,
        build: &(dyn Fn(&MirrorHost) -> Result<Url> + Send + Sync),
    ) -> Result<ResponseWrapper> {
        match self.requests.make_request(build(host)?).await {
            Err(err @ MirrorError::Unreachable { .. }) => {
                let Some(alternative) = self.fallback_for(host)? else {
                    tracing::warn!("{} unreachable and no other host is known", host);
                    return Err(err);
                };
                tracing::warn!("{} unreachable ({}), retrying on {}", host, err, alternative);
                let wrapper = self.requests.make_request(build(&alternative)?).await?;
                Ok(wrapper.into_fallback())
            }
            other => other,
        }
    }

    async fn refresh(&self) {
        if let Err(e) = self.router.update_routing_info().await {
            tracing::warn!("Failed to refresh routing information: {}", e);
        }
    }
}

#[async_trait]
impl<K, V> MirrorClient<K, V> for PartitionedMirrorClient<K, V>
where
    K: Send + Sync,
    V: DeserializeOwned + Send,
{
    async fn get(&self, key: &K) -> Result<Option<V>> {
        let host = self.router.find_host(key)?;
        let text = self.key_codec.to_text(key);

        let wrapper = self
            .request_with_fallback(&host, &|h: &MirrorHost| h.key_url(&text))
            .await?;
        if wrapper.is_fallback() {
            self.refresh().await;
        }
        process_response(&wrapper, decode_envelope)
    }

    async fn get_many(&self, keys: &[K]) -> Result<Vec<V>> {
        let mut by_host: HashMap<MirrorHost, Vec<String>> = HashMap::new();
        let mut singles: Vec<(MirrorHost, String)> = Vec::new();
        for key in keys {
            let host = self.router.find_host(key)?;
            let text = self.key_codec.to_text(key);
            if batchable(&text) {
                by_host.entry(host).or_default().push(text);
            } else {
                singles.push((host, text));
            }
        }

        let batches = by_host.iter().map(|(host, ids)| async move {
            self.request_with_fallback(host, &|h: &MirrorHost| h.keys_url(ids))
                .await
        });
        let lookups = singles.iter().map(|(host, text)| async move {
            self.request_with_fallback(host, &|h: &MirrorHost| h.key_url(text))
                .await
        });
        let (batch_responses, single_responses) = futures::join!(join_all(batches), join_all(lookups));

        if batch_responses
            .iter()
            .chain(single_responses.iter())
            .any(|r| matches!(r, Ok(w) if w.is_fallback()))
        {
            self.refresh().await;
        }

        let mut values = Vec::new();
        for response in batch_responses {
            let wrapper = response?;
            if let Some(batch) = process_response::<Vec<V>, _>(&wrapper, decode_envelope)? {
                values.extend(batch);
            }
        }
        for response in single_responses {
            let wrapper = response?;
            values.extend(process_response::<V, _>(&wrapper, decode_envelope)?);
        }
        Ok(values)
    }

    async fn get_all(&self) -> Result<Vec<V>> {
        let hosts = self.router.all_hosts()?;
        if hosts.is_empty() {
            return Err(MirrorError::RouterNotInitialized);
        }

        let requests = hosts.iter().map(|host| async move {
            match host.all_url() {
                Ok(url) => self.requests.make_request(url).await,
                Err(e) => Err(e),
            }
        });
        let responses = join_all(requests).await;

        let needs_refresh = responses.iter().any(|r| match r {
            Ok(w) => w.is_fallback(),
            Err(e) => matches!(e, MirrorError::Unreachable { .. }),
        });
        if needs_refresh {
            self.refresh().await;
        }

        let mut values = Vec::new();
        for response in responses {
            let wrapper = response?;
            if let Some(batch) = process_response::<Vec<V>, _>(&wrapper, decode_envelope)? {
                values.extend(batch);
            }
        }
        Ok(values)
    }

    async fn get_range(&self, key: &K, from: &str, to: &str) -> Result<Vec<V>> {
        let host = self.router.find_host(key)?;
        let text = self.key_codec.to_text(key);

        let wrapper = self
            .request_with_fallback(&host, &|h: &MirrorHost| h.range_url(&text, from, to))
            .await?;
        if wrapper.is_fallback() {
            self.refresh().await;
        }
        Ok(process_response(&wrapper, decode_envelope)?.unwrap_or_default())
    }
}
