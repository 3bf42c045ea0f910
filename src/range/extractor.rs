use super::padder::RangeFieldType;
use crate::error::{MirrorError, Result};
use serde_json::Value;

const WRONG_TYPE: &str = "Range field should be either of type integer or long";

/// Resolves the encoding strategy of `field` from an Avro-style record schema.
///
/// Accepted field types are `int` and `long`, logical types built on them
/// (`date`, `time-millis`, `timestamp-millis`, `timestamp-micros`) and nullable
/// unions of those.
pub fn range_field_type(schema: &Value, field: &str) -> Result<RangeFieldType> {
    let fields = schema
        .get("fields")
        .and_then(Value::as_array)
        .ok_or_else(|| MirrorError::RangeIndex("Schema is not a record schema".to_string()))?;

    let declared = fields
        .iter()
        .find(|f| f.get("name").and_then(Value::as_str) == Some(field))
        .and_then(|f| f.get("type"))
        .ok_or_else(|| {
            MirrorError::RangeIndex(format!("Could not find field {} in schema", field))
        })?;

    resolve(declared).ok_or_else(|| MirrorError::RangeIndex(WRONG_TYPE.to_string()))
}

fn resolve(declared: &Value) -> Option<RangeFieldType> {
    match declared {
        Value::String(name) => match name.as_str() {
            "int" => Some(RangeFieldType::Int),
            "long" => Some(RangeFieldType::Long),
            _ => None,
        },
        Value::Object(inner) => inner.get("type").and_then(resolve),
        Value::Array(branches) => {
            let mut non_null = branches.iter().filter(|b| b.as_str() != Some("null"));
            match (non_null.next(), non_null.next()) {
                (Some(only), None) => resolve(only),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Reads the range field out of a record value.
pub fn extract(value: &Value, field: &str, field_type: RangeFieldType) -> Result<i64> {
    let raw = value
        .get(field)
        .ok_or_else(|| MirrorError::RangeIndex(format!("Record has no field {}", field)))?;

    let number = raw.as_i64().ok_or_else(|| {
        MirrorError::RangeIndex(format!("Field {} is not an integral number: {}", field, raw))
    })?;

    if field_type == RangeFieldType::Int && i32::try_from(number).is_err() {
        return Err(MirrorError::RangeIndex(format!(
            "Field {} does not fit an int: {}",
            field, number
        )));
    }
    Ok(number)
}
