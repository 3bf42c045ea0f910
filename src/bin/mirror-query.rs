use clap::{Parser, Subcommand};
use mirror_mesh::client::host::{DEFAULT_PREFIX, MirrorHost};
use mirror_mesh::client::mirror::{DefaultMirrorClient, MirrorClient, PartitionedMirrorClient};
use mirror_mesh::client::request::HttpRequestManager;
use mirror_mesh::client::routing::{PartitionRouter, Router};
use mirror_mesh::codec::primitive::{IntCodec, LongCodec, StringCodec};
use mirror_mesh::codec::{Codec, TopicType};
use mirror_mesh::streams::partitioner::Murmur2PartitionFinder;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mirror-query", about = "Queries a mirror directly or through its partition map")]
struct QueryArgs {
    /// Service name (prefixed) or `host:port` (with `--direct`).
    #[arg(long, env = "MIRROR_QUERY_HOST")]
    host: String,

    /// Address the host verbatim instead of prefixing it.
    #[arg(long)]
    direct: bool,

    #[arg(long, env = "MIRROR_QUERY_PREFIX", default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Route every key to the replica owning its partition.
    #[arg(long)]
    partitioned: bool,

    #[arg(long, value_enum, env = "MIRROR_QUERY_KEY_TYPE", default_value = "string")]
    key_type: TopicType,

    #[arg(long, env = "MIRROR_QUERY_TIMEOUT_MS", default_value_t = 500)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Get { key: String },
    GetMany { keys: Vec<String> },
    GetAll,
    Range { key: String, from: String, to: String },
    Exists { key: String },
    Partitions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = QueryArgs::parse();

    match args.key_type {
        TopicType::String => execute::<String>(args, Arc::new(StringCodec)).await,
        TopicType::Integer => execute::<i32>(args, Arc::new(IntCodec)).await,
        TopicType::Long => execute::<i64>(args, Arc::new(LongCodec)).await,
        other => anyhow::bail!("Unsupported key type: {:?}", other),
    }
}

async fn execute<K>(args: QueryArgs, key_codec: Arc<dyn Codec<Item = K>>) -> anyhow::Result<()>
where
    K: Send + Sync + 'static,
{
    let host = if args.direct {
        MirrorHost::direct(args.host.clone())
    } else {
        MirrorHost::with_custom_prefix(args.host.clone(), args.prefix.clone())
    };
    let timeout = Duration::from_millis(args.timeout_ms);
    let requests = Arc::new(HttpRequestManager::new(timeout)?);

    let partitions_url = host.partitions_url()?;

    let client: Box<dyn MirrorClient<K, Value>> = if args.partitioned {
        let router = PartitionRouter::new(
            args.host.clone(),
            key_codec.clone(),
            Arc::new(Murmur2PartitionFinder),
            reqwest::Client::builder().timeout(timeout).build()?,
        )
        .with_discovery_host(host);
        router.update_routing_info().await?;
        Box::new(PartitionedMirrorClient::<K, Value>::new(
            key_codec.clone(),
            Arc::new(router),
            requests,
        ))
    } else {
        Box::new(DefaultMirrorClient::<K, Value>::new(host, key_codec.clone(), requests))
    };

    let output = match args.command {
        Command::Get { key } => match client.get(&key_codec.from_text(&key)?).await? {
            Some(value) => value,
            None => anyhow::bail!("Key {} not found", key),
        },
        Command::GetMany { keys } => {
            let keys = keys
                .iter()
                .map(|k| key_codec.from_text(k))
                .collect::<Result<Vec<_>, _>>()?;
            Value::Array(client.get_many(&keys).await?)
        }
        Command::GetAll => Value::Array(client.get_all().await?),
        Command::Range { key, from, to } => {
            let key = key_codec.from_text(&key)?;
            Value::Array(client.get_range(&key, &from, &to).await?)
        }
        Command::Exists { key } => Value::Bool(client.exists(&key_codec.from_text(&key)?).await),
        Command::Partitions => reqwest::Client::builder()
            .timeout(timeout)
            .build()?
            .get(partitions_url)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
