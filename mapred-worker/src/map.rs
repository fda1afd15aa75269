use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{anyhow, Context, Error};
use bytes::Bytes;
use tracing::info;

use common::codec;
use common::{ihash, KeyValue};

use crate::core::TaskReply;

/// Execute a map task: run the workload's map function over the named
/// input file and spill one intermediate bucket per reduce partition.
///
/// Buckets are written straight to their final `mr-<map>-<reduce>`
/// address. A duplicate attempt rewrites the same files with identical
/// content, so last-writer-wins is harmless.
pub async fn perform_map(task: &TaskReply, work_dir: &Path) -> Result<(), Error> {
    let workload = workload::try_named(&task.workload)
        .ok_or_else(|| anyhow!("The workload `{}` is not a known workload", task.workload))?;

    info!(task_id = task.task_id, input = %task.input_file, "starting map task");

    let contents = fs::read(&task.input_file)
        .with_context(|| format!("cannot read map input `{}`", task.input_file))?;

    let kv = KeyValue::new(Bytes::from(task.input_file.clone()), Bytes::from(contents));
    let aux = Bytes::from(task.aux.join(" "));

    let pairs = (workload.map_fn)(kv, aux)?;

    let mut buckets: Vec<Vec<KeyValue>> = vec![Vec::new(); task.n_reduce as usize];
    for pair in pairs {
        let pair = pair?;
        let bucket = ihash(&pair.key) % task.n_reduce;
        buckets[bucket as usize].push(pair);
    }

    // Empty buckets are spilled too: a completed map task leaves a file
    // at every address it owns.
    for (reduce_id, bucket) in buckets.iter().enumerate() {
        let path = work_dir.join(codec::intermediate_file(task.task_id, reduce_id as u32));
        let writer = BufWriter::new(
            File::create(&path).with_context(|| format!("cannot create `{}`", path.display()))?,
        );
        codec::write_pairs(writer, bucket)?;
    }

    info!(task_id = task.task_id, "map task finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    use crate::core::TaskKind;

    fn map_task(task_id: u32, input_file: &str, n_map: u32, n_reduce: u32) -> TaskReply {
        TaskReply {
            kind: TaskKind::Map as i32,
            task_id,
            input_file: input_file.to_string(),
            n_map,
            n_reduce,
            workload: "wc".to_string(),
            aux: vec![],
        }
    }

    #[tokio::test]
    async fn pairs_land_in_the_bucket_their_key_hashes_to() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.txt");
        fs::write(&input, "apple banana apple").unwrap();

        let task = map_task(0, input.to_str().unwrap(), 1, 3);
        perform_map(&task, dir.path()).await.unwrap();

        let mut total = 0;
        for reduce_id in 0..3 {
            let path = dir.path().join(codec::intermediate_file(0, reduce_id));
            let pairs = codec::read_pairs(BufReader::new(File::open(path).unwrap())).unwrap();

            for pair in &pairs {
                assert_eq!(ihash(&pair.key) % 3, reduce_id);
                assert_eq!(pair.value, "1");
            }
            total += pairs.len();
        }

        // one pair per word, spread across all three buckets
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn every_bucket_file_exists_even_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.txt");
        fs::write(&input, "solo").unwrap();

        let task = map_task(2, input.to_str().unwrap(), 3, 4);
        perform_map(&task, dir.path()).await.unwrap();

        for reduce_id in 0..4 {
            assert!(dir
                .path()
                .join(codec::intermediate_file(2, reduce_id))
                .exists());
        }
    }

    #[tokio::test]
    async fn unknown_workload_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = map_task(0, "whatever.txt", 1, 1);
        task.workload = "no-such-workload".to_string();

        assert!(perform_map(&task, dir.path()).await.is_err());
    }
}
