//! Line codec and addressing scheme for intermediate spill files.
//!
//! Each intermediate file holds one key-value pair per line, with key and
//! value encoded as URL-safe base64 and separated by a single space. The
//! encoding keeps the line format unambiguous for arbitrary bytes (keys
//! containing spaces, newlines, or non-UTF-8 data).

use std::io::{BufRead, Write};

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use bytes::Bytes;

use crate::KeyValue;

/// Name of the intermediate file holding the pairs that map task `map_id`
/// produced for reduce partition `reduce_id`.
pub fn intermediate_file(map_id: u32, reduce_id: u32) -> String {
    format!("mr-{}-{}", map_id, reduce_id)
}

/// Name of the final output file for reduce partition `reduce_id`.
pub fn output_file(reduce_id: u32) -> String {
    format!("mr-out-{}", reduce_id)
}

/// Encode a single pair as one line (without trailing newline).
pub fn encode_pair(kv: &KeyValue) -> String {
    format!("{} {}", URL_SAFE.encode(&kv.key), URL_SAFE.encode(&kv.value))
}

/// Decode one line produced by [`encode_pair`].
pub fn decode_pair(line: &str) -> Result<KeyValue> {
    let (key, value) = line
        .split_once(' ')
        .ok_or_else(|| anyhow!("malformed intermediate line: `{line}`"))?;

    let key = URL_SAFE.decode(key)?;
    let value = URL_SAFE.decode(value)?;

    Ok(KeyValue::new(Bytes::from(key), Bytes::from(value)))
}

/// Write all pairs to `writer`, one encoded line each.
pub fn write_pairs<W: Write>(mut writer: W, pairs: &[KeyValue]) -> Result<()> {
    for kv in pairs {
        writeln!(writer, "{}", encode_pair(kv))?;
    }
    writer.flush()?;
    Ok(())
}

/// Read back every pair written by [`write_pairs`]. Empty lines are
/// skipped.
pub fn read_pairs<R: BufRead>(reader: R) -> Result<Vec<KeyValue>> {
    let mut pairs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        pairs.push(decode_pair(&line)?);
    }
    Ok(pairs)
}
