use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::protocol::{
    ENDPOINT_INTERNAL_KEY, ENDPOINT_INTERNAL_RANGE, ENDPOINT_MIRROR, ENDPOINT_MIRROR_KEY,
    ENDPOINT_MIRROR_KEYS, ENDPOINT_MIRROR_RANGE, ENDPOINT_PARTITIONS, HEADER_EXISTS, ManyParams,
    MirrorValue, RangeParams, UPDATE_PARTITION_HOST_MAPPING_HEADER,
};
use super::service::{QueryResponse, QueryService};
use crate::error::MirrorError;

fn respond<T: Serialize>(response: QueryResponse<T>) -> Response {
    let body = Json(MirrorValue {
        value: response.value,
    });
    if response.stale_mapping {
        (
            StatusCode::OK,
            [(UPDATE_PARTITION_HOST_MAPPING_HEADER, HEADER_EXISTS)],
            body,
        )
            .into_response()
    } else {
        (StatusCode::OK, body).into_response()
    }
}

fn fail(operation: &str, err: MirrorError) -> Response {
    match &err {
        MirrorError::NotFound(_) => tracing::debug!("{}: {}", operation, err),
        e if e.is_retryable() => tracing::warn!("{}: {}", operation, e),
        e => tracing::error!("{}: {}", operation, e),
    }
    err.into_response()
}

pub async fn handle_get<K>(
    Extension(service): Extension<Arc<QueryService<K>>>,
    Path(raw_key): Path<String>,
) -> Response
where
    K: Send + Sync + 'static,
{
    let key = match service.key_codec().from_text(&raw_key) {
        Ok(k) => k,
        Err(e) => return fail("get", e),
    };

    match service.get(&key).await {
        Ok(response) => respond(response),
        Err(e) => fail("get", e),
    }
}

pub async fn handle_get_many<K>(
    Extension(service): Extension<Arc<QueryService<K>>>,
    Query(params): Query<ManyParams>,
) -> Response
where
    K: Send + Sync + 'static,
{
    let mut keys = Vec::new();
    for raw in params.ids.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match service.key_codec().from_text(raw) {
            Ok(k) => keys.push(k),
            Err(e) => return fail("get_many", e),
        }
    }

    match service.get_many(&keys).await {
        Ok(response) => respond(response),
        Err(e) => fail("get_many", e),
    }
}

pub async fn handle_get_all<K>(Extension(service): Extension<Arc<QueryService<K>>>) -> Response
where
    K: Send + Sync + 'static,
{
    match service.get_all() {
        Ok(response) => respond(response),
        Err(e) => fail("get_all", e),
    }
}

pub async fn handle_get_range<K>(
    Extension(service): Extension<Arc<QueryService<K>>>,
    Path(raw_key): Path<String>,
    Query(params): Query<RangeParams>,
) -> Response
where
    K: Send + Sync + 'static,
{
    let key = match service.key_codec().from_text(&raw_key) {
        Ok(k) => k,
        Err(e) => return fail("get_range", e),
    };

    match service.get_range(&key, &params.from, &params.to).await {
        Ok(response) => respond(response),
        Err(e) => fail("get_range", e),
    }
}

/// Point read proxied by another mirror.
pub async fn handle_get_internal<K>(
    Extension(service): Extension<Arc<QueryService<K>>>,
    Path(raw_key): Path<String>,
) -> Response
where
    K: Send + Sync + 'static,
{
    let result = service
        .key_codec()
        .from_text(&raw_key)
        .and_then(|key| service.get_local(&key));

    match result {
        Ok(response) => respond(response),
        Err(e) => fail("get_internal", e),
    }
}

pub async fn handle_get_range_internal<K>(
    Extension(service): Extension<Arc<QueryService<K>>>,
    Path(raw_key): Path<String>,
    Query(params): Query<RangeParams>,
) -> Response
where
    K: Send + Sync + 'static,
{
    let result = service
        .key_codec()
        .from_text(&raw_key)
        .and_then(|key| service.get_range_local(&key, &params.from, &params.to));

    match result {
        Ok(response) => respond(response),
        Err(e) => fail("get_range_internal", e),
    }
}

pub async fn handle_partitions<K>(Extension(service): Extension<Arc<QueryService<K>>>) -> Response
where
    K: Send + Sync + 'static,
{
    match service.partition_map() {
        Ok(map) => (StatusCode::OK, Json(map)).into_response(),
        Err(e) => fail("partitions", e),
    }
}

/// The HTTP surface of one mirror.
pub fn router<K>(service: Arc<QueryService<K>>) -> Router
where
    K: Send + Sync + 'static,
{
    Router::new()
        .route(ENDPOINT_MIRROR, get(handle_get_all::<K>))
        .route(ENDPOINT_MIRROR_KEYS, get(handle_get_many::<K>))
        .route(ENDPOINT_MIRROR_KEY, get(handle_get::<K>))
        .route(ENDPOINT_MIRROR_RANGE, get(handle_get_range::<K>))
        .route(ENDPOINT_PARTITIONS, get(handle_partitions::<K>))
        .route(ENDPOINT_INTERNAL_KEY, get(handle_get_internal::<K>))
        .route(ENDPOINT_INTERNAL_RANGE, get(handle_get_range_internal::<K>))
        .layer(Extension(service))
        .layer(TraceLayer::new_for_http())
}
