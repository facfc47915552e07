use serde::{de, Deserializer};
use std::fmt;
use thiserror::Error;

pub const KB: u64 = 1_000;
pub const MB: u64 = 1_000_000;
pub const GB: u64 = 1_000_000_000;
pub const TB: u64 = 1_000_000_000_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SizeError {
    #[error("Malformed size '{0}', expected a byte count or a number with B/KB/MB/GB/TB")]
    Malformed(String),
    #[error("Size '{0}' does not fit into 64 bits")]
    Overflow(String),
}

/// Parse a human readable size into bytes.
///
/// Bare numbers are bytes, suffixes are decimal units and case-insensitive.
/// Fractional byte counts are truncated.
pub fn parse_size(text: &str) -> Result<u64, SizeError> {
    let trimmed = text.trim();
    let split = trimmed
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let factor = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" => KB,
        "MB" => MB,
        "GB" => GB,
        "TB" => TB,
        _ => return Err(SizeError::Malformed(text.to_owned())),
    };

    let number = number.trim();
    if number.is_empty() {
        return Err(SizeError::Malformed(text.to_owned()));
    }

    // integers stay exact, only fall back to floats for fractional input
    if let Ok(whole) = number.parse::<u64>() {
        return whole
            .checked_mul(factor)
            .ok_or_else(|| SizeError::Overflow(text.to_owned()));
    }

    match number.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => {
            let bytes = value * factor as f64;

            if bytes >= u64::MAX as f64 {
                Err(SizeError::Overflow(text.to_owned()))
            } else {
                Ok(bytes as u64)
            }
        }
        _ => Err(SizeError::Malformed(text.to_owned())),
    }
}

/// serde helper for config fields that take either a byte count or a size string
pub fn deserialize_bytes<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(BytesVisitor)
}

struct BytesVisitor;

impl<'de> de::Visitor<'de> for BytesVisitor {
    type Value = u64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a byte count or a size string such as \"400GB\"")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
        Ok(value)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<u64, E> {
        u64::try_from(value).map_err(|_| E::custom(format!("size cannot be negative: {value}")))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<u64, E> {
        parse_size(&value.to_string()).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<u64, E> {
        parse_size(value).map_err(E::custom)
    }
}
