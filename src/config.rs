//! Command-line and environment configuration of a mirror replica.

use crate::codec::{TopicData, TopicType, WriteType};
use crate::membership::types::Member;
use crate::range::extractor;
use crate::range::padder::RangeFieldType;
use anyhow::{Context, bail};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "mirror", about = "Serves a partitioned topic as a queryable mirror")]
pub struct MirrorArgs {
    /// Gossip (UDP) bind address.
    #[arg(long, env = "MIRROR_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Gossip seed replicas.
    #[arg(long = "seed", env = "MIRROR_SEEDS", value_delimiter = ',')]
    pub seeds: Vec<SocketAddr>,

    /// HTTP port. Defaults to the gossip port + 1000.
    #[arg(long, env = "MIRROR_HTTP_PORT")]
    pub http_port: Option<u16>,

    /// HTTP addresses of the other replicas. Disables gossip when set.
    #[arg(long = "peer", env = "MIRROR_PEERS", value_delimiter = ',')]
    pub peers: Vec<SocketAddr>,

    #[arg(long, env = "MIRROR_TOPIC")]
    pub topic: String,

    #[arg(long, env = "MIRROR_PARTITIONS", default_value_t = 8)]
    pub partitions: u32,

    #[arg(long, env = "MIRROR_STANDBY_REPLICAS", default_value_t = 0)]
    pub standby_replicas: usize,

    #[arg(long, value_enum, env = "MIRROR_KEY_TYPE", default_value = "string")]
    pub key_type: TopicType,

    #[arg(long, value_enum, env = "MIRROR_VALUE_TYPE", default_value = "schema")]
    pub value_type: TopicType,

    #[arg(long, value_enum, env = "MIRROR_WRITE_TYPE", default_value = "mutable")]
    pub write_type: WriteType,

    /// Record schema (JSON) of the values; required with `--range-field`.
    #[arg(long, env = "MIRROR_VALUE_SCHEMA")]
    pub value_schema: Option<PathBuf>,

    #[arg(long, env = "MIRROR_RANGE_FIELD")]
    pub range_field: Option<String>,

    #[arg(long, env = "MIRROR_RETENTION_SECS")]
    pub retention_secs: Option<u64>,

    /// Newline-delimited JSON records appended to the log at startup.
    #[arg(long, env = "MIRROR_RECORDS")]
    pub records: Option<PathBuf>,

    #[arg(long, env = "MIRROR_REQUEST_TIMEOUT_MS", default_value_t = 500)]
    pub request_timeout_ms: u64,
}

impl MirrorArgs {
    pub fn http_addr(&self) -> anyhow::Result<SocketAddr> {
        let port = match self.http_port {
            Some(port) => port,
            None => self
                .bind
                .port()
                .checked_add(1000)
                .with_context(|| format!("No HTTP port derivable from {}", self.bind))?,
        };
        Ok(SocketAddr::new(self.bind.ip(), port))
    }

    pub fn is_static(&self) -> bool {
        !self.peers.is_empty()
    }

    /// Members of a static deployment, identified by their HTTP address.
    pub fn static_members(&self) -> anyhow::Result<(Member, Vec<Member>)> {
        let http_addr = self.http_addr()?;
        let local = Member::fixed(http_addr.to_string(), http_addr);
        let peers = self
            .peers
            .iter()
            .map(|addr| Member::fixed(addr.to_string(), *addr))
            .collect();
        Ok((local, peers))
    }

    pub fn topic_data(&self) -> TopicData {
        let mut topic = TopicData::new(self.topic.clone(), self.key_type, self.value_type)
            .with_write_type(self.write_type);
        if let Some(field) = &self.range_field {
            topic = topic.with_range_field(field.clone());
        }
        if let Some(secs) = self.retention_secs {
            topic = topic.with_retention(Duration::from_secs(secs));
        }
        topic
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Resolves the range field's encoding from the value schema.
    pub fn range_field_type(&self) -> anyhow::Result<Option<RangeFieldType>> {
        let Some(field) = &self.range_field else {
            return Ok(None);
        };
        if self.value_type != TopicType::Schema {
            bail!("A range field requires schema values, got {:?}", self.value_type);
        }
        let Some(path) = &self.value_schema else {
            bail!("--value-schema is required with --range-field");
        };

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema {}", path.display()))?;
        let schema: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("Schema {} is not JSON", path.display()))?;

        Ok(Some(extractor::range_field_type(&schema, field)?))
    }
}
