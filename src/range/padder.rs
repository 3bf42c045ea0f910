use crate::error::{MirrorError, Result};

/// Encoding strategy for a range field.
///
/// Values are written as fixed-width decimal strings of the value with its sign bit
/// flipped. Flipping the sign bit maps the signed order onto the unsigned order
/// (`MIN` becomes zero), and the fixed width makes lexicographic order equal numeric
/// order. `Int` uses 10 digits, `Long` 20.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeFieldType {
    Int,
    Long,
}

impl RangeFieldType {
    pub fn width(&self) -> usize {
        match self {
            RangeFieldType::Int => 10,
            RangeFieldType::Long => 20,
        }
    }

    pub fn pad(&self, value: i64) -> Result<String> {
        match self {
            RangeFieldType::Int => {
                let v = i32::try_from(value).map_err(|_| {
                    MirrorError::RangeIndex(format!("Value {} does not fit an int range field", value))
                })?;
                Ok(format!("{:010}", (v as u32) ^ 0x8000_0000))
            }
            RangeFieldType::Long => Ok(format!("{:020}", (value as u64) ^ 0x8000_0000_0000_0000)),
        }
    }

    /// Pads a bound given as text, e.g. a `from`/`to` query parameter.
    pub fn pad_text(&self, raw: &str) -> Result<String> {
        let value: i64 = raw
            .trim()
            .parse()
            .map_err(|_| MirrorError::BadArgument(format!("Invalid range bound: {}", raw)))?;
        self.pad(value)
    }

    pub fn unpad(&self, padded: &str) -> Result<i64> {
        let invalid = || MirrorError::RangeIndex(format!("Invalid padded value: {}", padded));
        if padded.len() != self.width() {
            return Err(invalid());
        }
        match self {
            RangeFieldType::Int => {
                let raw: u32 = padded.parse().map_err(|_| invalid())?;
                Ok(((raw ^ 0x8000_0000) as i32) as i64)
            }
            RangeFieldType::Long => {
                let raw: u64 = padded.parse().map_err(|_| invalid())?;
                Ok((raw ^ 0x8000_0000_0000_0000) as i64)
            }
        }
    }
}
