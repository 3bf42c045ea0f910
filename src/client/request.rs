use crate::error::{MirrorError, Result};
use crate::query::protocol::UPDATE_PARTITION_HOST_MAPPING_HEADER;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::time::Duration;

/// Where a response came from, relative to the caller's routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOrigin {
    /// The mapped owner answered directly.
    Primary,
    /// A proxy or a fallback host answered; the routing table is stale.
    Fallback,
}

/// A raw response body tagged with its origin. An empty body means not found.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseWrapper {
    body: Option<Vec<u8>>,
    origin: ResponseOrigin,
}

impl ResponseWrapper {
    pub fn new(body: Option<Vec<u8>>, origin: ResponseOrigin) -> Self {
        Self { body, origin }
    }

    pub fn primary(body: Option<Vec<u8>>) -> Self {
        Self::new(body, ResponseOrigin::Primary)
    }

    pub fn fallback(body: Option<Vec<u8>>) -> Self {
        Self::new(body, ResponseOrigin::Fallback)
    }

    pub fn origin(&self) -> ResponseOrigin {
        self.origin
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == ResponseOrigin::Fallback
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Marks a response obtained after retrying on another host.
    pub fn into_fallback(self) -> Self {
        Self {
            origin: ResponseOrigin::Fallback,
            ..self
        }
    }
}

/// Issues one request and reports the response with its origin.
#[async_trait]
pub trait RequestManager: Send + Sync {
    async fn make_request(&self, url: Url) -> Result<ResponseWrapper>;
}

/// Decodes a wrapper's body. The origin does not influence decoding.
pub fn process_response<T, F>(wrapper: &ResponseWrapper, decoder: F) -> Result<Option<T>>
where
    F: FnOnce(&[u8]) -> Result<T>,
{
    wrapper.body().map(decoder).transpose()
}

pub struct HttpRequestManager {
    http_client: reqwest::Client,
}

impl HttpRequestManager {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MirrorError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http_client })
    }

    pub fn from_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl RequestManager for HttpRequestManager {
    async fn make_request(&self, url: Url) -> Result<ResponseWrapper> {
        let host = match (url.host_str(), url.port()) {
            (Some(h), Some(p)) => format!("{}:{}", h, p),
            (Some(h), None) => h.to_string(),
            _ => url.to_string(),
        };
        let unreachable = |e: reqwest::Error| MirrorError::Unreachable {
            host: host.clone(),
            reason: e.to_string(),
        };

        tracing::debug!("GET {}", url);
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(unreachable)?;

        let origin = if response
            .headers()
            .contains_key(UPDATE_PARTITION_HOST_MAPPING_HEADER)
        {
            ResponseOrigin::Fallback
        } else {
            ResponseOrigin::Primary
        };

        let status = response.status();
        let body = response.bytes().await.map_err(unreachable)?;

        match status {
            StatusCode::NOT_FOUND => Ok(ResponseWrapper::new(None, origin)),
            s if s.is_success() => Ok(ResponseWrapper::new(Some(body.to_vec()), origin)),
            s => Err(MirrorError::from_remote(s.as_u16(), &body)),
        }
    }
}
