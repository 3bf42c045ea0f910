//! Mirror Client Tests
//!
//! ## Test Scopes
//! - **Addressing**: literal URLs for every operation, prefixed and direct.
//! - **Routing**: deterministic lookup, routing gaps, refresh from a live partition map.
//! - **Requests**: status and header handling against a live HTTP server.
//! - **Fallback Protocol**: retries, stale flags and the one-refresh-per-call rule,
//!   driven by scripted request managers and counting routers.

#[cfg(test)]
mod tests {
    use crate::client::host::MirrorHost;
    use crate::client::mirror::{DefaultMirrorClient, MirrorClient, PartitionedMirrorClient};
    use crate::client::request::{
        HttpRequestManager, RequestManager, ResponseOrigin, ResponseWrapper, process_response,
    };
    use crate::client::routing::{PartitionRouter, Router, RoutingTable};
    use crate::codec::primitive::StringCodec;
    use crate::error::{MirrorError, Result};
    use crate::query::protocol::{HEADER_EXISTS, UPDATE_PARTITION_HOST_MAPPING_HEADER};
    use crate::streams::partitioner::PartitionFinder;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use reqwest::Url;
    use serde_json::{Value, json};
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    async fn serve(app: axum::Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    async fn dead_addr() -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    /// Routes keys by a fixed key -> partition table.
    struct ScriptedFinder(HashMap<Vec<u8>, u32>);

    impl ScriptedFinder {
        fn new(pairs: &[(&str, u32)]) -> Self {
            Self(
                pairs
                    .iter()
                    .map(|(k, p)| (k.as_bytes().to_vec(), *p))
                    .collect(),
            )
        }
    }

    impl PartitionFinder for ScriptedFinder {
        fn partition_for(&self, serialized_key: &[u8], _num_partitions: u32) -> u32 {
            self.0.get(serialized_key).copied().unwrap_or(u32::MAX)
        }
    }

    /// A router with a fixed key -> host table that counts refreshes.
    struct CountingRouter {
        hosts: HashMap<String, MirrorHost>,
        all: Vec<MirrorHost>,
        updates: AtomicUsize,
    }

    impl CountingRouter {
        fn new(pairs: &[(&str, &str)]) -> Self {
            let hosts: HashMap<String, MirrorHost> = pairs
                .iter()
                .map(|(k, h)| (k.to_string(), MirrorHost::direct(*h)))
                .collect();
            let mut all: Vec<MirrorHost> = Vec::new();
            for (_, h) in pairs {
                let host = MirrorHost::direct(*h);
                if !all.contains(&host) {
                    all.push(host);
                }
            }
            Self {
                hosts,
                all,
                updates: AtomicUsize::new(0),
            }
        }

        fn with_extra_host(mut self, host: &str) -> Self {
            self.all.push(MirrorHost::direct(host));
            self
        }

        fn updates(&self) -> usize {
            self.updates.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Router<String> for CountingRouter {
        fn find_host(&self, key: &String) -> Result<MirrorHost> {
            self.hosts
                .get(key)
                .cloned()
                .ok_or(MirrorError::NoHostForPartition(9))
        }

        fn all_hosts(&self) -> Result<Vec<MirrorHost>> {
            Ok(self.all.clone())
        }

        async fn update_routing_info(&self) -> Result<()> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Answers from an in-memory table per host; hosts can be down or stale.
    #[derive(Default)]
    struct ScriptedRequests {
        values: HashMap<String, HashMap<String, Value>>,
        down: HashSet<String>,
        stale: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRequests {
        fn host(mut self, host: &str, values: &[(&str, Value)]) -> Self {
            self.values.insert(
                host.to_string(),
                values
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            );
            self
        }

        fn down(mut self, host: &str) -> Self {
            self.down.insert(host.to_string());
            self
        }

        fn stale(mut self, host: &str) -> Self {
            self.stale.insert(host.to_string());
            self
        }

        fn calls_to(&self, host: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|h| h.as_str() == host)
                .count()
        }
    }

    #[async_trait]
    impl RequestManager for ScriptedRequests {
        async fn make_request(&self, url: Url) -> Result<ResponseWrapper> {
            let host = format!("{}:{}", url.host_str().unwrap(), url.port().unwrap());
            self.calls.lock().unwrap().push(host.clone());

            if self.down.contains(&host) {
                return Err(MirrorError::Unreachable {
                    host,
                    reason: "connection refused".to_string(),
                });
            }
            let origin = if self.stale.contains(&host) {
                ResponseOrigin::Fallback
            } else {
                ResponseOrigin::Primary
            };
            let empty = HashMap::new();
            let values = self.values.get(&host).unwrap_or(&empty);

            let segments: Vec<String> = url
                .path_segments()
                .unwrap()
                .map(|s| s.to_string())
                .collect();
            let body = match segments.as_slice() {
                [m] if m == "mirror" => Some(json!({"value": values.values().cloned().collect::<Vec<_>>()})),
                [m, k] if m == "mirror" && k == "keys" => {
                    let ids = url
                        .query_pairs()
                        .find(|(name, _)| name == "ids")
                        .map(|(_, v)| v.into_owned())
                        .unwrap_or_default();
                    let found: Vec<Value> = ids
                        .split(',')
                        .filter_map(|id| values.get(id).cloned())
                        .collect();
                    Some(json!({ "value": found }))
                }
                [m, key] if m == "mirror" => values.get(key).map(|v| json!({ "value": v })),
                _ => None,
            };

            Ok(ResponseWrapper::new(
                body.map(|b| serde_json::to_vec(&b).unwrap()),
                origin,
            ))
        }
    }

    fn partitioned(
        router: Arc<CountingRouter>,
        requests: Arc<ScriptedRequests>,
    ) -> PartitionedMirrorClient<String, Value> {
        PartitionedMirrorClient::<String, Value>::new(Arc::new(StringCodec), router, requests)
    }

    // ============================================================
    // HOST ADDRESSING
    // ============================================================

    #[test]
    fn test_prefixed_urls() {
        let host = MirrorHost::with_prefix("purchases");

        assert_eq!(
            host.key_url("123").unwrap().as_str(),
            "http://quick-mirror-purchases/mirror/123"
        );
        assert_eq!(
            host.keys_url(&["1".to_string(), "2".to_string()])
                .unwrap()
                .as_str(),
            "http://quick-mirror-purchases/mirror/keys?ids=1%2C2"
        );
        assert_eq!(
            host.all_url().unwrap().as_str(),
            "http://quick-mirror-purchases/mirror"
        );
        assert_eq!(
            host.range_url("1", "1", "4").unwrap().as_str(),
            "http://quick-mirror-purchases/mirror/range/1?from=1&to=4"
        );
        assert_eq!(
            host.partitions_url().unwrap().as_str(),
            "http://quick-mirror-purchases/streams/partitions"
        );
    }

    #[test]
    fn test_direct_and_custom_prefix_urls() {
        assert_eq!(
            MirrorHost::direct("127.0.0.1:8080")
                .key_url("k")
                .unwrap()
                .as_str(),
            "http://127.0.0.1:8080/mirror/k"
        );
        assert_eq!(
            MirrorHost::with_custom_prefix("users", "mesh-")
                .all_url()
                .unwrap()
                .as_str(),
            "http://mesh-users/mirror"
        );
    }

    #[test]
    fn test_key_is_a_single_path_segment() {
        assert_eq!(
            MirrorHost::direct("h:1").key_url("a/b").unwrap().as_str(),
            "http://h:1/mirror/a%2Fb"
        );
    }

    #[test]
    fn test_internal_urls() {
        let host = MirrorHost::direct("10.0.0.2:8080");

        assert_eq!(
            host.internal_key_url("abc").unwrap().as_str(),
            "http://10.0.0.2:8080/internal/mirror/abc"
        );
        assert_eq!(
            host.internal_range_url("7", "-3", "0").unwrap().as_str(),
            "http://10.0.0.2:8080/internal/mirror/range/7?from=-3&to=0"
        );
    }

    #[test]
    fn test_host_identity_ignores_prefix() {
        assert_eq!(MirrorHost::with_prefix("a"), MirrorHost::direct("a"));
        assert_ne!(MirrorHost::direct("a"), MirrorHost::direct("b"));
        assert_eq!(MirrorHost::with_prefix("a").address(), "quick-mirror-a");
    }

    // ============================================================
    // ROUTING
    // ============================================================

    #[test]
    fn test_routing_table_from_document() {
        let document = BTreeMap::from([
            (1, "host-a:8080".to_string()),
            (2, "host-b:8080".to_string()),
            (4, "host-a:8080".to_string()),
        ]);
        let table = RoutingTable::from_document(&document);

        assert_eq!(table.num_partitions(), 5);
        assert_eq!(
            table.hosts(),
            vec![MirrorHost::direct("host-a:8080"), MirrorHost::direct("host-b:8080")]
        );
        assert!(table.host_for(3).is_none());
    }

    #[test]
    fn test_document_completeness() {
        let complete = RoutingTable::from_document(&BTreeMap::from([
            (0, "host-a:8080".to_string()),
            (1, "host-b:8080".to_string()),
        ]));
        assert!(complete.is_complete());

        // A missing top partition cannot be told apart from a smaller topic.
        let truncated = RoutingTable::from_document(&BTreeMap::from([
            (0, "host-a:8080".to_string()),
            (1, "host-b:8080".to_string()),
            (2, "host-a:8080".to_string()),
        ]));
        assert!(truncated.is_complete());
        assert_eq!(truncated.num_partitions(), 3);

        let gapped = RoutingTable::from_document(&BTreeMap::from([
            (0, "host-a:8080".to_string()),
            (3, "host-b:8080".to_string()),
        ]));
        assert!(!gapped.is_complete());
        assert_eq!(gapped.num_partitions(), 4);

        assert!(RoutingTable::from_document(&BTreeMap::new()).is_complete());
    }

    fn scripted_router(mapping: &[(u32, &str)]) -> PartitionRouter<String> {
        let document: BTreeMap<u32, String> =
            mapping.iter().map(|(p, h)| (*p, h.to_string())).collect();
        PartitionRouter::<String>::new(
            "purchases",
            Arc::new(StringCodec),
            Arc::new(ScriptedFinder::new(&[("k1", 1), ("k2", 2), ("k3", 3)])),
            reqwest::Client::new(),
        )
        .with_mapping(&document)
    }

    #[test]
    fn test_find_host_is_deterministic() {
        let router = scripted_router(&[(1, "host-a:1"), (2, "host-b:2")]);

        for _ in 0..5 {
            assert_eq!(
                router.find_host(&"k1".to_string()).unwrap(),
                MirrorHost::direct("host-a:1")
            );
            assert_eq!(
                router.find_host(&"k2".to_string()).unwrap(),
                MirrorHost::direct("host-b:2")
            );
        }
    }

    #[test]
    fn test_routing_gap_is_fatal() {
        let router = scripted_router(&[(1, "host-a:1"), (2, "host-b:2")]);

        let err = router.find_host(&"k3".to_string()).unwrap_err();
        assert_eq!(err, MirrorError::NoHostForPartition(3));
        assert_eq!(err.to_string(), "No host for partition: 3");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_uninitialized_router() {
        let router = scripted_router(&[]);
        assert_eq!(
            router.find_host(&"k1".to_string()).unwrap_err(),
            MirrorError::RouterNotInitialized
        );
    }

    #[tokio::test]
    async fn test_update_routing_info_replaces_table() {
        let app = axum::Router::new().route(
            "/streams/partitions",
            get(|| async { axum::Json(json!({"1": "host-a:1", "2": "host-a:1", "3": "host-c:3"})) }),
        );
        let addr = serve(app).await;

        let router = scripted_router(&[(1, "host-a:1"), (2, "host-b:2")])
            .with_discovery_host(MirrorHost::direct(addr.to_string()));
        router.update_routing_info().await.unwrap();

        assert_eq!(
            router.find_host(&"k2".to_string()).unwrap(),
            MirrorHost::direct("host-a:1")
        );
        assert_eq!(
            router.find_host(&"k3".to_string()).unwrap(),
            MirrorHost::direct("host-c:3")
        );
        assert_eq!(router.all_hosts().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_table() {
        let dead = dead_addr().await;
        let router = PartitionRouter::<String>::new(
            "purchases",
            Arc::new(StringCodec),
            Arc::new(ScriptedFinder::new(&[("k1", 1)])),
            reqwest::Client::builder()
                .timeout(Duration::from_millis(300))
                .build()
                .unwrap(),
        )
        .with_mapping(&BTreeMap::from([(1, dead.to_string())]));

        let err = router.update_routing_info().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(
            router.find_host(&"k1".to_string()).unwrap(),
            MirrorHost::direct(dead.to_string())
        );
    }

    // ============================================================
    // REQUEST MANAGER
    // ============================================================

    #[test]
    fn test_process_response_ignores_origin() {
        let body = Some(br#"{"value": 5}"#.to_vec());
        let decode = |b: &[u8]| -> Result<Value> { Ok(serde_json::from_slice(b)?) };

        let primary = process_response(&ResponseWrapper::primary(body.clone()), decode).unwrap();
        let fallback = process_response(&ResponseWrapper::fallback(body), decode).unwrap();
        assert_eq!(primary, fallback);

        let empty = process_response(&ResponseWrapper::fallback(None), decode).unwrap();
        assert!(empty.is_none());
    }

    #[tokio::test]
    async fn test_http_request_manager_statuses() {
        let app = axum::Router::new()
            .route(
                "/mirror/present",
                get(|| async { axum::Json(json!({"value": 1})) }),
            )
            .route(
                "/mirror/proxied",
                get(|| async {
                    (
                        [(UPDATE_PARTITION_HOST_MAPPING_HEADER, HEADER_EXISTS)],
                        axum::Json(json!({"value": 2})),
                    )
                }),
            )
            .route(
                "/mirror/gone",
                get(|| async {
                    (
                        StatusCode::NOT_FOUND,
                        [(UPDATE_PARTITION_HOST_MAPPING_HEADER, HEADER_EXISTS)],
                    )
                }),
            )
            .route(
                "/mirror/busy",
                get(|| async { MirrorError::StoreNotAvailable.into_response() }),
            );
        let addr = serve(app).await;
        let host = MirrorHost::direct(addr.to_string());
        let requests = HttpRequestManager::new(Duration::from_millis(500)).unwrap();

        let present = requests
            .make_request(host.key_url("present").unwrap())
            .await
            .unwrap();
        assert_eq!(present.origin(), ResponseOrigin::Primary);
        assert!(present.body().is_some());

        let proxied = requests
            .make_request(host.key_url("proxied").unwrap())
            .await
            .unwrap();
        assert!(proxied.is_fallback());

        let gone = requests
            .make_request(host.key_url("gone").unwrap())
            .await
            .unwrap();
        assert!(gone.body().is_none());
        assert!(gone.is_fallback());

        let busy = requests
            .make_request(host.key_url("busy").unwrap())
            .await
            .unwrap_err();
        assert_eq!(busy, MirrorError::StoreNotAvailable);
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let dead = dead_addr().await;
        let requests = HttpRequestManager::new(Duration::from_millis(300)).unwrap();

        let err = requests
            .make_request(MirrorHost::direct(dead.to_string()).key_url("k").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, MirrorError::Unreachable { .. }));
    }

    // ============================================================
    // DEFAULT CLIENT
    // ============================================================

    #[tokio::test]
    async fn test_default_client_reads_one_host() {
        let requests = Arc::new(
            ScriptedRequests::default().host("h:1", &[("a", json!(1)), ("b", json!(2))]),
        );
        let client: DefaultMirrorClient<String, Value> = DefaultMirrorClient::new(
            MirrorHost::direct("h:1"),
            Arc::new(StringCodec),
            requests.clone(),
        );

        assert_eq!(client.get(&"a".to_string()).await.unwrap(), Some(json!(1)));
        assert_eq!(client.get(&"zz".to_string()).await.unwrap(), None);
        assert!(client.exists(&"b".to_string()).await);
        assert!(!client.exists(&"zz".to_string()).await);

        let mut many = client
            .get_many(&["a".to_string(), "zz".to_string(), "b".to_string()])
            .await
            .unwrap();
        many.sort_by_key(|v| v.as_i64());
        assert_eq!(many, vec![json!(1), json!(2)]);
        assert!(client.get_many(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comma_key_is_fetched_alone() {
        let requests = Arc::new(
            ScriptedRequests::default()
                .host("h:1", &[("a", json!(1)), ("b", json!(2)), ("a,b", json!(3))]),
        );
        let client: DefaultMirrorClient<String, Value> = DefaultMirrorClient::new(
            MirrorHost::direct("h:1"),
            Arc::new(StringCodec),
            requests.clone(),
        );

        let mut many = client
            .get_many(&["a".to_string(), "a,b".to_string()])
            .await
            .unwrap();
        many.sort_by_key(|v| v.as_i64());
        assert_eq!(many, vec![json!(1), json!(3)]);
        assert_eq!(requests.calls_to("h:1"), 2);

        let only = client.get_many(&["a,b".to_string()]).await.unwrap();
        assert_eq!(only, vec![json!(3)]);
    }

    // ============================================================
    // PARTITIONED CLIENT: FALLBACK PROTOCOL
    // ============================================================

    #[tokio::test]
    async fn test_primary_response_does_not_refresh() {
        let router = Arc::new(CountingRouter::new(&[("k", "a:1")]));
        let requests = Arc::new(ScriptedRequests::default().host("a:1", &[("k", json!("v"))]));
        let client = partitioned(router.clone(), requests);

        assert_eq!(client.get(&"k".to_string()).await.unwrap(), Some(json!("v")));
        assert_eq!(router.updates(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_owner_falls_back_once() {
        let router = Arc::new(CountingRouter::new(&[("k", "a:1")]).with_extra_host("b:2"));
        let requests = Arc::new(
            ScriptedRequests::default()
                .down("a:1")
                .host("b:2", &[("k", json!("v"))]),
        );
        let client = partitioned(router.clone(), requests.clone());

        assert_eq!(client.get(&"k".to_string()).await.unwrap(), Some(json!("v")));
        assert_eq!(requests.calls_to("a:1"), 1);
        assert_eq!(requests.calls_to("b:2"), 1);
        assert_eq!(router.updates(), 1);
    }

    #[tokio::test]
    async fn test_fallback_failure_surfaces() {
        let router = Arc::new(CountingRouter::new(&[("k", "a:1")]).with_extra_host("b:2"));
        let requests = Arc::new(ScriptedRequests::default().down("a:1").down("b:2"));
        let client = partitioned(router.clone(), requests.clone());

        let err = client.get(&"k".to_string()).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(requests.calls_to("a:1") + requests.calls_to("b:2"), 2);
        assert!(!client.exists(&"k".to_string()).await);
    }

    #[tokio::test]
    async fn test_configured_fallback_host_is_preferred() {
        let router = Arc::new(CountingRouter::new(&[("k", "a:1")]).with_extra_host("b:2"));
        let requests = Arc::new(
            ScriptedRequests::default()
                .down("a:1")
                .host("lb:9", &[("k", json!("v"))]),
        );
        let client = partitioned(router.clone(), requests.clone())
            .with_fallback_host(MirrorHost::direct("lb:9"));

        assert_eq!(client.get(&"k".to_string()).await.unwrap(), Some(json!("v")));
        assert_eq!(requests.calls_to("b:2"), 0);
        assert_eq!(requests.calls_to("lb:9"), 1);
    }

    #[tokio::test]
    async fn test_stale_header_refreshes_once() {
        let router = Arc::new(CountingRouter::new(&[("k", "a:1")]));
        let requests = Arc::new(
            ScriptedRequests::default()
                .host("a:1", &[("k", json!("v"))])
                .stale("a:1"),
        );
        let client = partitioned(router.clone(), requests);

        assert_eq!(client.get(&"k".to_string()).await.unwrap(), Some(json!("v")));
        assert_eq!(router.updates(), 1);
    }

    #[tokio::test]
    async fn test_batch_refreshes_once_per_call() {
        let router = Arc::new(CountingRouter::new(&[
            ("k1", "a:1"),
            ("k2", "b:2"),
            ("k3", "c:3"),
            ("k4", "c:3"),
        ]));
        let requests = Arc::new(
            ScriptedRequests::default()
                .host("a:1", &[("k1", json!(1))])
                .host("b:2", &[("k2", json!(2))])
                .host("c:3", &[("k3", json!(3)), ("k4", json!(4))])
                .stale("b:2")
                .stale("c:3"),
        );
        let client = partitioned(router.clone(), requests.clone());

        let keys: Vec<String> = ["k1", "k2", "k3", "k4"].iter().map(|k| k.to_string()).collect();
        let mut values = client.get_many(&keys).await.unwrap();
        values.sort_by_key(|v| v.as_i64());

        assert_eq!(values, vec![json!(1), json!(2), json!(3), json!(4)]);
        assert_eq!(requests.calls_to("c:3"), 1, "one request per host");
        assert_eq!(router.updates(), 1);
    }

    #[tokio::test]
    async fn test_batch_with_comma_key_refreshes_once() {
        let router = Arc::new(CountingRouter::new(&[("k1", "a:1"), ("x,y", "a:1"), ("k2", "b:2")]));
        let requests = Arc::new(
            ScriptedRequests::default()
                .host("a:1", &[("k1", json!(1)), ("x,y", json!(5))])
                .host("b:2", &[("k2", json!(2))])
                .stale("a:1"),
        );
        let client = partitioned(router.clone(), requests.clone());

        let keys: Vec<String> = ["k1", "x,y", "k2"].iter().map(|k| k.to_string()).collect();
        let mut values = client.get_many(&keys).await.unwrap();
        values.sort_by_key(|v| v.as_i64());

        assert_eq!(values, vec![json!(1), json!(2), json!(5)]);
        assert_eq!(requests.calls_to("a:1"), 2);
        assert_eq!(router.updates(), 1);
    }

    #[tokio::test]
    async fn test_no_stale_header_no_refresh() {
        let router = Arc::new(CountingRouter::new(&[("k1", "a:1"), ("k2", "b:2")]));
        let requests = Arc::new(
            ScriptedRequests::default()
                .host("a:1", &[("k1", json!(1))])
                .host("b:2", &[("k2", json!(2))]),
        );
        let client = partitioned(router.clone(), requests);

        let values = client
            .get_many(&["k1".to_string(), "k2".to_string()])
            .await
            .unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(router.updates(), 0);

        let err = client.get(&"unmapped".to_string()).await.unwrap_err();
        assert_eq!(err, MirrorError::NoHostForPartition(9));
        assert_eq!(router.updates(), 0);
    }

    #[tokio::test]
    async fn test_get_all_fans_out() {
        let router = Arc::new(CountingRouter::new(&[("x", "a:1"), ("y", "b:2")]));
        let requests = Arc::new(
            ScriptedRequests::default()
                .host("a:1", &[("1", json!(1)), ("2", json!(2))])
                .host("b:2", &[("3", json!(3)), ("4", json!(4))]),
        );
        let client = partitioned(router.clone(), requests);

        let mut values = client.get_all().await.unwrap();
        values.sort_by_key(|v| v.as_i64());
        assert_eq!(values, vec![json!(1), json!(2), json!(3), json!(4)]);
        assert_eq!(router.updates(), 0);
    }
}
