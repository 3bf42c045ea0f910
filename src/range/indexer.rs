use super::extractor;
use super::padder::RangeFieldType;
use crate::codec::Codec;
use crate::error::{MirrorError, Result};
use serde_json::Value;
use std::sync::Arc;

/// Separates the escaped primary key from the padded range value.
pub const SEPARATOR: char = '_';

/// Escapes the separator (and the escape character itself) in a key's text form,
/// so that no key's prefix can collide with another key's group.
pub fn escape_key(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            SEPARATOR => escaped.push_str("%5F"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn composite(key_text: &str, padded: &str) -> String {
    format!("{}{}{}", escape_key(key_text), SEPARATOR, padded)
}

/// Splits a composite key into `(escaped key, padded value)`.
pub fn split_index(index: &str) -> Result<(&str, &str)> {
    index
        .rsplit_once(SEPARATOR)
        .ok_or_else(|| MirrorError::RangeIndex(format!("Not a range index key: {}", index)))
}

/// Builds range-store keys as records flow through the topology.
pub struct WriteRangeIndexer<K> {
    key_codec: Arc<dyn Codec<Item = K>>,
    field: String,
    field_type: RangeFieldType,
}

impl<K> WriteRangeIndexer<K> {
    pub fn new(
        key_codec: Arc<dyn Codec<Item = K>>,
        field: impl Into<String>,
        field_type: RangeFieldType,
    ) -> Self {
        Self {
            key_codec,
            field: field.into(),
            field_type,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn create_index(&self, key: &K, value: &Value) -> Result<String> {
        let number = extractor::extract(value, &self.field, self.field_type)?;
        let padded = self.field_type.pad(number)?;
        Ok(composite(&self.key_codec.to_text(key), &padded))
    }

    /// The prefix shared by every index entry of `key`.
    pub fn key_prefix(&self, key: &K) -> String {
        format!("{}{}", escape_key(&self.key_codec.to_text(key)), SEPARATOR)
    }
}

/// Computes scan boundaries for range queries.
pub struct ReadRangeIndexer<K> {
    key_codec: Arc<dyn Codec<Item = K>>,
    field_type: RangeFieldType,
}

impl<K> ReadRangeIndexer<K> {
    pub fn new(key_codec: Arc<dyn Codec<Item = K>>, field_type: RangeFieldType) -> Self {
        Self {
            key_codec,
            field_type,
        }
    }

    pub fn create_index(&self, key: &K, bound: &str) -> Result<String> {
        let padded = self.field_type.pad_text(bound)?;
        Ok(composite(&self.key_codec.to_text(key), &padded))
    }

    /// Inclusive `(from, to)` scan boundaries for `key`.
    pub fn bounds(&self, key: &K, from: &str, to: &str) -> Result<(String, String)> {
        Ok((self.create_index(key, from)?, self.create_index(key, to)?))
    }
}
