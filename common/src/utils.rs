use anyhow::Result;
use bytes::Bytes;

/// Convert a byte buffer into an owned UTF-8 string.
pub fn string_from_bytes(bytes: Bytes) -> Result<String> {
    Ok(String::from_utf8(bytes.to_vec())?)
}
