//! Named MapReduce applications.
//!
//! Workers receive a workload *name* with every task and resolve it here,
//! so application code ships with the worker binary rather than over the
//! wire.

use common::Workload;

pub mod grep;
pub mod word_count;

/// Look up a workload by its registered name.
pub fn try_named(name: &str) -> Option<Workload> {
    match name {
        "wc" => Some(Workload {
            map_fn: word_count::map,
            reduce_fn: word_count::reduce,
        }),
        "grep" => Some(Workload {
            map_fn: grep::map,
            reduce_fn: grep::reduce,
        }),
        _ => None,
    }
}
