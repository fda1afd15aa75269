use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Error};
use bytes::Bytes;
use tracing::{debug, info};

use common::codec;
use common::utils::string_from_bytes;
use common::KeyValue;

use crate::core::TaskReply;

/// Execute a reduce task: gather this partition's pairs from every map
/// task's output, group them by key, and write the final
/// `mr-out-<partition>` file.
pub async fn perform_reduce(task: &TaskReply, work_dir: &Path) -> Result<(), Error> {
    let workload = workload::try_named(&task.workload)
        .ok_or_else(|| anyhow!("The workload `{}` is not a known workload", task.workload))?;

    info!(task_id = task.task_id, "starting reduce task");

    let mut pairs: Vec<KeyValue> = Vec::new();
    for map_id in 0..task.n_map {
        let path = work_dir.join(codec::intermediate_file(map_id, task.task_id));
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // A map attempt that never finished contributes nothing;
                // its pairs come from the attempt that replaced it.
                debug!(path = %path.display(), "intermediate bucket missing, skipping");
                continue;
            }
            Err(e) => {
                return Err(
                    Error::from(e).context(format!("cannot open `{}`", path.display()))
                )
            }
        };
        pairs.extend(codec::read_pairs(BufReader::new(file))?);
    }

    // Sort by key, then by value, so grouping and output are identical
    // across runs no matter which worker produced which bucket.
    pairs.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.value.cmp(&b.value)));

    let out_path = work_dir.join(codec::output_file(task.task_id));
    let mut out = BufWriter::new(
        File::create(&out_path)
            .with_context(|| format!("cannot create `{}`", out_path.display()))?,
    );

    let aux = Bytes::from(task.aux.join(" "));
    let reduce_fn = workload.reduce_fn;

    let mut start = 0;
    while start < pairs.len() {
        let key = pairs[start].key();
        let end = start + pairs[start..].iter().take_while(|p| p.key == key).count();

        let values = pairs[start..end].iter().map(KeyValue::value);
        let output = reduce_fn(key.clone(), Box::new(values), aux.clone())?;

        // An empty result means the key produces no output line.
        if !output.is_empty() {
            writeln!(out, "{} {}", string_from_bytes(key)?, string_from_bytes(output)?)?;
        }

        start = end;
    }
    out.flush()?;

    info!(task_id = task.task_id, "reduce task finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::core::TaskKind;

    fn reduce_task(task_id: u32, n_map: u32, n_reduce: u32) -> TaskReply {
        TaskReply {
            kind: TaskKind::Reduce as i32,
            task_id,
            input_file: String::new(),
            n_map,
            n_reduce,
            workload: "wc".to_string(),
            aux: vec![],
        }
    }

    fn write_bucket(dir: &Path, map_id: u32, reduce_id: u32, pairs: &[(&str, &str)]) {
        let pairs: Vec<KeyValue> = pairs
            .iter()
            .map(|(k, v)| KeyValue::new(Bytes::from(k.to_string()), Bytes::from(v.to_string())))
            .collect();
        let file = File::create(dir.join(codec::intermediate_file(map_id, reduce_id))).unwrap();
        codec::write_pairs(file, &pairs).unwrap();
    }

    #[tokio::test]
    async fn missing_buckets_count_as_empty_contributions() {
        let dir = tempfile::tempdir().unwrap();

        // n_map is 3 but only map task 1 ever spilled a bucket
        write_bucket(dir.path(), 1, 0, &[("b", "1"), ("a", "1"), ("a", "1")]);

        perform_reduce(&reduce_task(0, 3, 1), dir.path()).await.unwrap();

        let out = fs::read_to_string(dir.path().join(codec::output_file(0))).unwrap();
        assert_eq!(out, "a 2\nb 1\n");
    }

    #[tokio::test]
    async fn output_is_grouped_and_sorted_across_map_inputs() {
        let dir = tempfile::tempdir().unwrap();

        write_bucket(dir.path(), 0, 0, &[("pear", "1")]);
        write_bucket(dir.path(), 1, 0, &[("apple", "1"), ("pear", "1")]);

        perform_reduce(&reduce_task(0, 2, 1), dir.path()).await.unwrap();

        let out = fs::read_to_string(dir.path().join(codec::output_file(0))).unwrap();
        assert_eq!(out, "apple 1\npear 2\n");
    }

    #[tokio::test]
    async fn output_does_not_depend_on_bucket_distribution() {
        // the same multiset of pairs, split differently across map
        // outputs, must produce byte-identical results
        let run = |pairs_by_map: Vec<Vec<(&'static str, &'static str)>>| async move {
            let dir = tempfile::tempdir().unwrap();
            let n_map = pairs_by_map.len() as u32;
            for (map_id, pairs) in pairs_by_map.iter().enumerate() {
                write_bucket(dir.path(), map_id as u32, 0, pairs);
            }
            perform_reduce(&reduce_task(0, n_map, 1), dir.path()).await.unwrap();
            fs::read_to_string(dir.path().join(codec::output_file(0))).unwrap()
        };

        let first = run(vec![
            vec![("x", "1"), ("y", "1")],
            vec![("x", "1")],
        ])
        .await;
        let second = run(vec![
            vec![],
            vec![("y", "1"), ("x", "1"), ("x", "1")],
        ])
        .await;

        assert_eq!(first, second);
        assert_eq!(first, "x 2\ny 1\n");
    }
}
