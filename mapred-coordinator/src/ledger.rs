//! The task ledger: the authoritative record of every map and reduce
//! task in the job.
//!
//! Pure bookkeeping. No I/O, no clock, no locking — callers pass the
//! current instant in and serialize access, which keeps every transition
//! deterministic and testable without sleeping.

use std::time::{Duration, Instant};

/// Which side of the job a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Map,
    Reduce,
}

/// Lifecycle of a single task.
///
/// Idle → InProgress → Completed. An expired lease makes an InProgress
/// task assignable again; it is re-issued directly with a fresh lease
/// rather than moving back through Idle. Completed never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    /// Not yet handed to any worker.
    Idle,

    /// Claimed by some worker until the lease deadline passes.
    InProgress { lease_deadline: Instant },

    /// A completion report was accepted for this task.
    Completed,
}

/// Coarse job stage, derived from task states on every call rather than
/// cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Map,
    Reduce,
    Done,
}

/// A task handed to a worker, carrying the job-wide constants the worker
/// needs to address intermediate files without further lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub kind: TaskKind,

    /// Index within the task's kind. For map tasks this also indexes the
    /// input file; for reduce tasks it is the output partition number.
    pub task_id: u32,

    /// Input file for map tasks; empty for reduce tasks, whose input is
    /// every intermediate bucket carrying their partition number.
    pub input_file: String,

    pub n_map: u32,
    pub n_reduce: u32,
}

#[derive(Debug)]
pub struct TaskLedger {
    input_files: Vec<String>,
    map_tasks: Vec<TaskState>,
    reduce_tasks: Vec<TaskState>,
    lease: Duration,
}

impl TaskLedger {
    /// Build the ledger for a job with one map task per input file and
    /// `n_reduce` output partitions. Every task starts Idle.
    pub fn new(input_files: Vec<String>, n_reduce: u32, lease: Duration) -> Self {
        let map_tasks = vec![TaskState::Idle; input_files.len()];
        let reduce_tasks = vec![TaskState::Idle; n_reduce as usize];

        Self {
            input_files,
            map_tasks,
            reduce_tasks,
            lease,
        }
    }

    pub fn n_map(&self) -> u32 {
        self.input_files.len() as u32
    }

    pub fn n_reduce(&self) -> u32 {
        self.reduce_tasks.len() as u32
    }

    /// Offer the next assignable map task, if any, claiming it with a
    /// lease running from `now`.
    pub fn next_map_task(&mut self, now: Instant) -> Option<Assignment> {
        let task_id = claim_next(&mut self.map_tasks, now, self.lease)?;

        Some(Assignment {
            kind: TaskKind::Map,
            task_id,
            input_file: self.input_files[task_id as usize].clone(),
            n_map: self.n_map(),
            n_reduce: self.n_reduce(),
        })
    }

    /// Offer the next assignable reduce task. Callers gate this on
    /// [`TaskLedger::map_phase_done`]; the ledger itself only tracks
    /// state.
    pub fn next_reduce_task(&mut self, now: Instant) -> Option<Assignment> {
        let task_id = claim_next(&mut self.reduce_tasks, now, self.lease)?;

        Some(Assignment {
            kind: TaskKind::Reduce,
            task_id,
            input_file: String::new(),
            n_map: self.n_map(),
            n_reduce: self.n_reduce(),
        })
    }

    /// Record a completion report for a task.
    ///
    /// Idempotent by design: duplicate reports (a reassigned task's
    /// original claimant finishing late) and out-of-range ids are
    /// absorbed as no-ops, never errors.
    pub fn mark_completed(&mut self, kind: TaskKind, task_id: u32) {
        let tasks = match kind {
            TaskKind::Map => &mut self.map_tasks,
            TaskKind::Reduce => &mut self.reduce_tasks,
        };

        if let Some(task) = tasks.get_mut(task_id as usize) {
            *task = TaskState::Completed;
        }
    }

    pub fn map_phase_done(&self) -> bool {
        self.map_tasks.iter().all(|t| *t == TaskState::Completed)
    }

    pub fn reduce_phase_done(&self) -> bool {
        self.reduce_tasks.iter().all(|t| *t == TaskState::Completed)
    }

    pub fn phase(&self) -> Phase {
        if !self.map_phase_done() {
            Phase::Map
        } else if !self.reduce_phase_done() {
            Phase::Reduce
        } else {
            Phase::Done
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase() == Phase::Done
    }
}

/// Scan for the first Idle task in ascending id order; failing that, the
/// first InProgress task whose lease has expired. The claimed task gets a
/// lease deadline of `now + lease` either way.
///
/// The fixed scan order makes task offering reproducible: under
/// contention the lowest assignable id always wins.
fn claim_next(tasks: &mut [TaskState], now: Instant, lease: Duration) -> Option<u32> {
    let fresh_deadline = now + lease;

    if let Some(id) = tasks.iter().position(|t| *t == TaskState::Idle) {
        tasks[id] = TaskState::InProgress {
            lease_deadline: fresh_deadline,
        };
        return Some(id as u32);
    }

    let expired = |t: &TaskState| {
        matches!(t, TaskState::InProgress { lease_deadline } if now >= *lease_deadline)
    };
    if let Some(id) = tasks.iter().position(expired) {
        tasks[id] = TaskState::InProgress {
            lease_deadline: fresh_deadline,
        };
        return Some(id as u32);
    }

    None
}
