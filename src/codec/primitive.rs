use super::Codec;
use crate::error::{MirrorError, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

#[derive(Debug, Clone, Copy, Default)]
pub struct IntCodec;

#[derive(Debug, Clone, Copy, Default)]
pub struct LongCodec;

impl Codec for StringCodec {
    type Item = String;

    fn encode(&self, item: &String) -> Result<Vec<u8>> {
        Ok(item.as_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| MirrorError::Codec(e.to_string()))
    }

    fn to_text(&self, item: &String) -> String {
        item.clone()
    }

    fn from_text(&self, raw: &str) -> Result<String> {
        Ok(raw.to_string())
    }
}

impl Codec for IntCodec {
    type Item = i32;

    fn encode(&self, item: &i32) -> Result<Vec<u8>> {
        Ok(item.to_be_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<i32> {
        let raw: [u8; 4] = bytes.try_into().map_err(|_| {
            MirrorError::Codec(format!("Expected 4 bytes for an integer, got {}", bytes.len()))
        })?;
        Ok(i32::from_be_bytes(raw))
    }

    fn to_text(&self, item: &i32) -> String {
        item.to_string()
    }

    fn from_text(&self, raw: &str) -> Result<i32> {
        raw.trim()
            .parse()
            .map_err(|e| MirrorError::BadArgument(format!("'{}' is not an integer: {}", raw, e)))
    }
}

impl Codec for LongCodec {
    type Item = i64;

    fn encode(&self, item: &i64) -> Result<Vec<u8>> {
        Ok(item.to_be_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<i64> {
        let raw: [u8; 8] = bytes.try_into().map_err(|_| {
            MirrorError::Codec(format!("Expected 8 bytes for a long, got {}", bytes.len()))
        })?;
        Ok(i64::from_be_bytes(raw))
    }

    fn to_text(&self, item: &i64) -> String {
        item.to_string()
    }

    fn from_text(&self, raw: &str) -> Result<i64> {
        raw.trim()
            .parse()
            .map_err(|e| MirrorError::BadArgument(format!("'{}' is not a long: {}", raw, e)))
    }
}
