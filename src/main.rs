use clap::Parser;
use mirror_mesh::client::request::HttpRequestManager;
use mirror_mesh::codec::primitive::{IntCodec, LongCodec, StringCodec};
use mirror_mesh::codec::value::ValueCodec;
use mirror_mesh::codec::{Codec, TopicType};
use mirror_mesh::config::MirrorArgs;
use mirror_mesh::membership::service::MembershipService;
use mirror_mesh::membership::view::{MemberView, StaticMembership};
use mirror_mesh::query::handlers::router;
use mirror_mesh::query::service::QueryService;
use mirror_mesh::range::indexer::{ReadRangeIndexer, WriteRangeIndexer};
use mirror_mesh::streams::log::PartitionedLog;
use mirror_mesh::streams::partitioner::{Murmur2PartitionFinder, PartitionFinder, PartitionManager};
use mirror_mesh::streams::producer::Producer;
use mirror_mesh::streams::runtime::StreamsRuntime;
use mirror_mesh::streams::topology::Topology;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = MirrorArgs::parse();

    match args.key_type {
        TopicType::String => run::<String>(args, Arc::new(StringCodec)).await,
        TopicType::Integer => run::<i32>(args, Arc::new(IntCodec)).await,
        TopicType::Long => run::<i64>(args, Arc::new(LongCodec)).await,
        other => anyhow::bail!("Unsupported key type: {:?}", other),
    }
}

async fn run<K>(args: MirrorArgs, key_codec: Arc<dyn Codec<Item = K>>) -> anyhow::Result<()>
where
    K: Send + Sync + 'static,
{
    let http_addr = args.http_addr()?;
    let topic = args.topic_data();
    let range_field_type = args.range_field_type()?;

    tracing::info!(
        "Starting mirror for topic {} ({} partitions, {} standby replica(s))",
        topic.name,
        args.partitions,
        args.standby_replicas
    );

    // 1. Membership (static list or UDP gossip):
    let members: Arc<dyn MemberView> = if args.is_static() {
        let (local, peers) = args.static_members()?;
        tracing::info!("Static membership with {} peer(s)", peers.len());
        Arc::new(StaticMembership::new(local, peers))
    } else {
        if args.seeds.is_empty() {
            tracing::info!("Starting as seed replica (founder)");
        } else {
            tracing::info!("Seed replicas: {:?}", args.seeds);
        }
        let membership = MembershipService::new(args.bind, http_addr, args.seeds.clone()).await?;
        tracing::info!("Replica ID: {:?}", membership.local_member.id);
        membership.clone().start().await;
        spawn_stats_reporter(membership.clone());
        membership
    };

    // 2. Log, assignment and runtime:
    let finder: Arc<dyn PartitionFinder> = Arc::new(Murmur2PartitionFinder);
    let partitions = Arc::new(
        PartitionManager::new(members, args.partitions, args.standby_replicas)
            .with_finder(finder.clone()),
    );
    let runtime = Arc::new(StreamsRuntime::new(partitions));
    let log = Arc::new(PartitionedLog::new(args.partitions, finder));

    if let Some(path) = &args.records {
        Producer::new(log.clone(), key_codec.clone(), ValueCodec::new(topic.value_type))
            .load_file(path)?;
    }

    // 3. Topology and query service:
    let requests = Arc::new(HttpRequestManager::new(args.request_timeout())?);
    let mut topology = Topology::new(topic.clone(), runtime.clone(), log, key_codec.clone());
    let mut service = QueryService::new(topic.clone(), runtime.clone(), key_codec.clone(), requests);

    if let (Some(field), Some(field_type)) = (&topic.range_field, range_field_type) {
        tracing::info!("Range index on field {} ({:?})", field, field_type);
        topology = topology.with_range_indexer(WriteRangeIndexer::new(
            key_codec.clone(),
            field.clone(),
            field_type,
        ));
        service = service.with_range_reader(ReadRangeIndexer::new(key_codec, field_type));
    }

    Arc::new(topology).start();

    // 4. HTTP server:
    let app = router(Arc::new(service));
    let listener = tokio::net::TcpListener::bind(http_addr).await?;

    tracing::info!("HTTP server listening on {}", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            if let Err(e) = runtime.stop() {
                tracing::error!("Failed to stop runtime: {}", e);
            }
        })
        .await?;

    Ok(())
}

fn spawn_stats_reporter(membership: Arc<MembershipService>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));

        loop {
            interval.tick().await;
            let alive = membership.get_alive_members();
            tracing::info!("Cluster stats: {} alive replica(s)", alive.len());
            for member in alive {
                tracing::debug!(
                    "  - {:?} gossip={} http={} (inc={})",
                    member.id,
                    member.gossip_addr,
                    member.http_addr,
                    member.incarnation
                );
            }
        }
    });
}
