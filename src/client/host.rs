use crate::error::{MirrorError, Result};
use crate::query::protocol::{ENDPOINT_MIRROR, ENDPOINT_PARTITIONS};
use reqwest::Url;
use std::hash::{Hash, Hasher};

/// Prefix turning a topic name into the mirror's service name.
pub const DEFAULT_PREFIX: &str = "quick-mirror-";

/// A logical mirror instance and the URLs of its operations.
///
/// Two hosts are equal when they name the same host, whatever the prefix.
#[derive(Debug, Clone)]
pub struct MirrorHost {
    host: String,
    prefix: Option<String>,
}

impl MirrorHost {
    /// A mirror addressed by service name, e.g. topic `purchases` becomes
    /// `quick-mirror-purchases`.
    pub fn with_prefix(name: impl Into<String>) -> Self {
        Self::with_custom_prefix(name, DEFAULT_PREFIX)
    }

    pub fn with_custom_prefix(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            host: name.into(),
            prefix: Some(prefix.into()),
        }
    }

    /// A mirror addressed by `host:port`, as published in the partition map.
    pub fn direct(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            prefix: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_prefixed(&self) -> bool {
        self.prefix.is_some()
    }

    /// The network name requests are sent to.
    pub fn address(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, self.host),
            None => self.host.clone(),
        }
    }

    fn url(&self, path: &str) -> Result<Url> {
        let raw = format!("http://{}{}", self.address(), path);
        Url::parse(&raw).map_err(|e| MirrorError::BadArgument(format!("Invalid URL {}: {}", raw, e)))
    }

    fn with_segments(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.url("/")?;
        url.path_segments_mut()
            .map_err(|_| MirrorError::BadArgument(format!("{} cannot carry a path", self.address())))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `GET /mirror/{key}`
    pub fn key_url(&self, key: &str) -> Result<Url> {
        self.with_segments(&["mirror", key])
    }

    /// `GET /mirror/keys?ids=k1,k2` (the comma is percent-encoded on the wire).
    ///
    /// The mirror splits `ids` on commas, so a key whose text contains one cannot be
    /// part of a batch.
    pub fn keys_url(&self, ids: &[String]) -> Result<Url> {
        let mut url = self.with_segments(&["mirror", "keys"])?;
        url.query_pairs_mut().append_pair("ids", &ids.join(","));
        Ok(url)
    }

    /// `GET /mirror`
    pub fn all_url(&self) -> Result<Url> {
        self.url(ENDPOINT_MIRROR)
    }

    /// `GET /mirror/range/{key}?from=..&to=..`
    pub fn range_url(&self, key: &str, from: &str, to: &str) -> Result<Url> {
        let mut url = self.with_segments(&["mirror", "range", key])?;
        url.query_pairs_mut()
            .append_pair("from", from)
            .append_pair("to", to);
        Ok(url)
    }

    /// `GET /internal/mirror/{key}`, used by mirrors proxying to each other.
    pub fn internal_key_url(&self, key: &str) -> Result<Url> {
        self.with_segments(&["internal", "mirror", key])
    }

    /// `GET /internal/mirror/range/{key}?from=..&to=..`
    pub fn internal_range_url(&self, key: &str, from: &str, to: &str) -> Result<Url> {
        let mut url = self.with_segments(&["internal", "mirror", "range", key])?;
        url.query_pairs_mut()
            .append_pair("from", from)
            .append_pair("to", to);
        Ok(url)
    }

    /// `GET /streams/partitions`
    pub fn partitions_url(&self) -> Result<Url> {
        self.url(ENDPOINT_PARTITIONS)
    }
}

impl PartialEq for MirrorHost {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host
    }
}

impl Eq for MirrorHost {}

impl Hash for MirrorHost {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.hash(state);
    }
}

impl std::fmt::Display for MirrorHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.address())
    }
}
