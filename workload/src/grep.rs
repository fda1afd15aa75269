//! Distributed grep: emit every input line containing the pattern given
//! as the job's auxiliary argument, counting occurrences per line text.

use anyhow::Result;
use bytes::Bytes;

use common::utils::string_from_bytes;
use common::{KeyValue, MapOutput};

pub fn map(kv: KeyValue, aux: Bytes) -> MapOutput {
    let pattern = string_from_bytes(aux)?;
    let contents = string_from_bytes(kv.value)?;

    let matches: Vec<String> = contents
        .lines()
        .filter(|line| line.contains(&pattern))
        .map(|line| line.to_string())
        .collect();

    let iter = matches.into_iter().map(|line| {
        Ok(KeyValue {
            key: Bytes::from(line),
            value: Bytes::from("1"),
        })
    });
    Ok(Box::new(iter))
}

pub fn reduce(
    _key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    _aux: Bytes,
) -> Result<Bytes> {
    Ok(Bytes::from(values.count().to_string()))
}
