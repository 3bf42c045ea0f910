//! Key and Value Codecs
//!
//! Every topic is read and written through a pair of codecs chosen at configuration time.
//! The serving path never assumes a wire format: it only calls the [`Codec`] capability.
//!
//! ## Submodules
//! - **`primitive`**: Key codecs for string, integer and long keys (big-endian like the producers).
//! - **`value`**: A value codec that renders every supported value type as JSON for responses.

pub mod primitive;
pub mod value;


use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Capability interface for a topic's keys or values.
///
/// `to_text`/`from_text` are the string forms used in URLs and query parameters,
/// `encode`/`decode` are the byte forms stored in the log and in the stores.
pub trait Codec: Send + Sync {
    type Item;

    fn encode(&self, item: &Self::Item) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Item>;

    fn to_text(&self, item: &Self::Item) -> String;

    fn from_text(&self, raw: &str) -> Result<Self::Item>;
}

/// The type of a topic's keys or values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TopicType {
    String,
    Integer,
    Long,
    Double,
    /// Structured records described by a record schema, carried as JSON objects.
    Schema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WriteType {
    Mutable,
    /// The first value written for a key is kept; later updates are ignored.
    Immutable,
}

/// Read-only topic metadata consumed by the topology and the query service.
#[derive(Debug, Clone)]
pub struct TopicData {
    pub name: String,
    pub write_type: WriteType,
    pub key_type: TopicType,
    pub value_type: TopicType,
    pub range_field: Option<String>,
    pub retention: Option<Duration>,
}

impl TopicData {
    pub fn new(name: impl Into<String>, key_type: TopicType, value_type: TopicType) -> Self {
        Self {
            name: name.into(),
            write_type: WriteType::Mutable,
            key_type,
            value_type,
            range_field: None,
            retention: None,
        }
    }

    pub fn with_range_field(mut self, field: impl Into<String>) -> Self {
        self.range_field = Some(field.into());
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = Some(retention);
        self
    }

    pub fn with_write_type(mut self, write_type: WriteType) -> Self {
        self.write_type = write_type;
        self
    }
}
