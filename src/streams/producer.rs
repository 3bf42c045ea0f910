use super::log::PartitionedLog;
use crate::codec::Codec;
use crate::codec::value::ValueCodec;
use crate::error::Result;
use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

/// One line of a records file. A `null` (or missing) value is a tombstone.
#[derive(Debug, Deserialize)]
struct RecordLine {
    key: Value,
    #[serde(default)]
    value: Value,
}

/// Writes typed records into the log, serializing them the way remote producers would.
pub struct Producer<K> {
    log: Arc<PartitionedLog>,
    key_codec: Arc<dyn Codec<Item = K>>,
    value_codec: ValueCodec,
}

impl<K> Producer<K> {
    pub fn new(
        log: Arc<PartitionedLog>,
        key_codec: Arc<dyn Codec<Item = K>>,
        value_codec: ValueCodec,
    ) -> Self {
        Self {
            log,
            key_codec,
            value_codec,
        }
    }

    pub fn send(&self, key: &K, value: &Value) -> Result<(u32, usize)> {
        let key = self.key_codec.encode(key)?;
        let value = self.value_codec.encode(value)?;
        Ok(self.log.append(key, Some(value)))
    }

    pub fn delete(&self, key: &K) -> Result<(u32, usize)> {
        let key = self.key_codec.encode(key)?;
        Ok(self.log.append(key, None))
    }

    /// Replays a newline-delimited JSON file of `{"key": .., "value": ..}` objects.
    pub fn load_file(&self, path: &Path) -> anyhow::Result<usize> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open records file {}", path.display()))?;

        let mut count = 0;
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let parsed: RecordLine = serde_json::from_str(&line)
                .with_context(|| format!("Line {}: malformed record", line_no + 1))?;
            let key_text = match &parsed.key {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let key = self
                .key_codec
                .from_text(&key_text)
                .with_context(|| format!("Line {}: bad key", line_no + 1))?;

            if parsed.value.is_null() {
                self.delete(&key)?;
            } else {
                self.send(&key, &parsed.value)
                    .with_context(|| format!("Line {}: bad value", line_no + 1))?;
            }
            count += 1;
        }

        tracing::info!("Loaded {} record(s) from {}", count, path.display());
        Ok(count)
    }
}
