//! Error taxonomy shared by the client and the serving side.
//!
//! Every failure that crosses a module boundary is a [`MirrorError`]. The variants distinguish
//! conditions a caller may usefully retry (an unreachable host, a store that is still restoring)
//! from terminal ones (a missing key, a routing gap, a stopped runtime).

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MirrorError {
    #[error("Key {0} not found")]
    NotFound(String),

    #[error("No host for partition: {0}")]
    NoHostForPartition(u32),

    #[error("Router has not been initialized properly")]
    RouterNotInitialized,

    #[error("Host {host} is unreachable: {reason}")]
    Unreachable { host: String, reason: String },

    #[error("Store currently not available")]
    StoreNotAvailable,

    #[error("Store is not running")]
    StoreNotRunning,

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Bad argument: {0}")]
    BadArgument(String),

    #[error("Range index error: {0}")]
    RangeIndex(String),

    #[error("Requested resource responded with status code {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, MirrorError>;

impl MirrorError {
    /// Whether repeating the same call later can succeed without any new information.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MirrorError::Unreachable { .. } | MirrorError::StoreNotAvailable
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            MirrorError::NotFound(_) => StatusCode::NOT_FOUND,
            MirrorError::Codec(_) | MirrorError::BadArgument(_) | MirrorError::RangeIndex(_) => {
                StatusCode::BAD_REQUEST
            }
            MirrorError::Unreachable { .. } => StatusCode::BAD_GATEWAY,
            MirrorError::StoreNotAvailable => StatusCode::SERVICE_UNAVAILABLE,
            MirrorError::Status { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            MirrorError::NoHostForPartition(_)
            | MirrorError::RouterNotInitialized
            | MirrorError::StoreNotRunning
            | MirrorError::Lock(_)
            | MirrorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            MirrorError::NotFound(_) => "not_found",
            MirrorError::NoHostForPartition(_) => "no_host_for_partition",
            MirrorError::RouterNotInitialized => "router_not_initialized",
            MirrorError::Unreachable { .. } => "unreachable",
            MirrorError::StoreNotAvailable => "store_not_available",
            MirrorError::StoreNotRunning => "store_not_running",
            MirrorError::Codec(_) => "codec",
            MirrorError::BadArgument(_) => "bad_argument",
            MirrorError::RangeIndex(_) => "range_index",
            MirrorError::Status { .. } => "status",
            MirrorError::Lock(_) => "lock",
            MirrorError::Internal(_) => "internal",
        }
    }

    /// Maps an error body returned by a peer back into the taxonomy.
    pub fn from_remote(status: u16, body: &[u8]) -> Self {
        let parsed: Option<ErrorBody> = serde_json::from_slice(body).ok();
        let message = parsed
            .as_ref()
            .map(|b| b.message.clone())
            .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());

        match (status, parsed.as_ref().map(|b| b.kind.as_str())) {
            (503, _) | (_, Some("store_not_available")) => MirrorError::StoreNotAvailable,
            (_, Some("store_not_running")) => MirrorError::StoreNotRunning,
            (_, Some("codec")) => MirrorError::Codec(message),
            (_, Some("range_index")) => MirrorError::RangeIndex(message),
            (400, _) => MirrorError::BadArgument(message),
            _ => MirrorError::Status { status, message },
        }
    }
}

/// JSON body attached to every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl IntoResponse for MirrorError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            kind: self.kind().to_string(),
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl<T> From<std::sync::PoisonError<T>> for MirrorError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

impl From<serde_json::Error> for MirrorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}
