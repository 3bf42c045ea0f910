use super::{Codec, TopicType};
use crate::error::{MirrorError, Result};
use serde_json::Value;

/// Value codec whose items are JSON values regardless of the stored byte format.
///
/// Primitive types are stored the way the producers write them (UTF-8, big-endian numbers);
/// schema records are stored as JSON objects.
#[derive(Debug, Clone, Copy)]
pub struct ValueCodec {
    value_type: TopicType,
}

impl ValueCodec {
    pub fn new(value_type: TopicType) -> Self {
        Self { value_type }
    }

    pub fn value_type(&self) -> TopicType {
        self.value_type
    }

    fn mismatch(&self, item: &Value) -> MirrorError {
        MirrorError::Codec(format!(
            "Value {} does not match topic type {:?}",
            item, self.value_type
        ))
    }
}

impl Codec for ValueCodec {
    type Item = Value;

    fn encode(&self, item: &Value) -> Result<Vec<u8>> {
        match self.value_type {
            TopicType::String => item
                .as_str()
                .map(|s| s.as_bytes().to_vec())
                .ok_or_else(|| self.mismatch(item)),
            TopicType::Integer => item
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(|n| n.to_be_bytes().to_vec())
                .ok_or_else(|| self.mismatch(item)),
            TopicType::Long => item
                .as_i64()
                .map(|n| n.to_be_bytes().to_vec())
                .ok_or_else(|| self.mismatch(item)),
            TopicType::Double => item
                .as_f64()
                .map(|n| n.to_be_bytes().to_vec())
                .ok_or_else(|| self.mismatch(item)),
            TopicType::Schema => {
                if !item.is_object() {
                    return Err(self.mismatch(item));
                }
                Ok(serde_json::to_vec(item)?)
            }
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        match self.value_type {
            TopicType::String => String::from_utf8(bytes.to_vec())
                .map(Value::String)
                .map_err(|e| MirrorError::Codec(e.to_string())),
            TopicType::Integer => {
                let raw: [u8; 4] = bytes
                    .try_into()
                    .map_err(|_| MirrorError::Codec("Expected 4 bytes for an integer".into()))?;
                Ok(Value::from(i32::from_be_bytes(raw)))
            }
            TopicType::Long => {
                let raw: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| MirrorError::Codec("Expected 8 bytes for a long".into()))?;
                Ok(Value::from(i64::from_be_bytes(raw)))
            }
            TopicType::Double => {
                let raw: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| MirrorError::Codec("Expected 8 bytes for a double".into()))?;
                serde_json::Number::from_f64(f64::from_be_bytes(raw))
                    .map(Value::Number)
                    .ok_or_else(|| MirrorError::Codec("Double is not a finite number".into()))
            }
            TopicType::Schema => Ok(serde_json::from_slice(bytes)?),
        }
    }

    fn to_text(&self, item: &Value) -> String {
        match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn from_text(&self, raw: &str) -> Result<Value> {
        match self.value_type {
            TopicType::String => Ok(Value::String(raw.to_string())),
            TopicType::Integer => raw
                .trim()
                .parse::<i32>()
                .map(Value::from)
                .map_err(|e| MirrorError::BadArgument(e.to_string())),
            TopicType::Long => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| MirrorError::BadArgument(e.to_string())),
            TopicType::Double => {
                let n = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| MirrorError::BadArgument(e.to_string()))?;
                serde_json::Number::from_f64(n)
                    .map(Value::Number)
                    .ok_or_else(|| MirrorError::BadArgument("Double is not finite".into()))
            }
            TopicType::Schema => Ok(serde_json::from_str(raw)?),
        }
    }
}
