//! Transport codec: pure conversions between wire payloads and typed values
//!
//! The transport hands us opaque byte buffers; every characteristic has a
//! fixed width and byte order, so decoding is total over the declared shape.
//! A payload shorter than the required width is a decode failure, never a
//! truncated or zero-padded value. No I/O happens here.

use crate::types::{FgError, Result, TypedValue, ValueShape};

/// Decode a payload as UTF-8 text. No length prefix, no trailing-null
/// trimming beyond what the raw bytes contain.
pub fn decode_string(bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        return Err(FgError::EmptyPayload);
    }
    Ok(String::from_utf8(bytes.to_vec())?)
}

/// Decode the first byte as an unsigned 8-bit value
pub fn decode_u8(bytes: &[u8]) -> Result<u8> {
    match bytes.first() {
        Some(b) => Ok(*b),
        None => Err(FgError::EmptyPayload),
    }
}

/// Decode the first two bytes as a big-endian unsigned 16-bit value
pub fn decode_u16_be(bytes: &[u8]) -> Result<u16> {
    if bytes.is_empty() {
        return Err(FgError::EmptyPayload);
    }
    if bytes.len() < 2 {
        return Err(FgError::ShortPayload {
            expected: 2,
            got: bytes.len(),
        });
    }
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Decode the first two bytes as a little-endian unsigned 16-bit value
pub fn decode_u16_le(bytes: &[u8]) -> Result<u16> {
    if bytes.is_empty() {
        return Err(FgError::EmptyPayload);
    }
    if bytes.len() < 2 {
        return Err(FgError::ShortPayload {
            expected: 2,
            got: bytes.len(),
        });
    }
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

pub fn encode_string(value: &str) -> Vec<u8> {
    value.as_bytes().to_vec()
}

pub fn encode_u8(value: u8) -> [u8; 1] {
    [value]
}

pub fn encode_u16_be(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

pub fn encode_u16_le(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

/// Decode a payload according to a characteristic's declared shape
pub fn decode_value(shape: ValueShape, bytes: &[u8]) -> Result<TypedValue> {
    match shape {
        ValueShape::Utf8Text => Ok(TypedValue::Text(decode_string(bytes)?)),
        ValueShape::U8 => Ok(TypedValue::U8(decode_u8(bytes)?)),
        ValueShape::U16Be => Ok(TypedValue::U16(decode_u16_be(bytes)?)),
        ValueShape::U16Le => Ok(TypedValue::U16(decode_u16_le(bytes)?)),
    }
}

/// Encode a typed value according to a characteristic's declared shape
pub fn encode_value(shape: ValueShape, value: &TypedValue) -> Result<Vec<u8>> {
    match (shape, value) {
        (ValueShape::Utf8Text, TypedValue::Text(s)) => Ok(encode_string(s)),
        (ValueShape::U8, TypedValue::U8(v)) => Ok(encode_u8(*v).to_vec()),
        (ValueShape::U16Be, TypedValue::U16(v)) => Ok(encode_u16_be(*v).to_vec()),
        (ValueShape::U16Le, TypedValue::U16(v)) => Ok(encode_u16_le(*v).to_vec()),
        (shape, value) => Err(FgError::InvalidValue(format!(
            "value {:?} does not match shape {}",
            value, shape
        ))),
    }
}

/// Format a System ID payload as lowercase colon-separated hex
pub fn format_system_id(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}
