use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

pub use coordinator::coordinator_server::{Coordinator, CoordinatorServer};
pub use coordinator::{CompletionReply, CompletionRequest, TaskKind, TaskReply, TaskRequest};
pub mod coordinator {
    tonic::include_proto!("coordinator");
}

use crate::ledger::{self, Assignment, Phase, TaskLedger};

/// Immutable description of the job being scheduled, echoed into every
/// task reply so workers stay stateless.
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Registered name of the MapReduce application.
    pub workload: String,

    /// Auxiliary arguments forwarded to the application.
    pub aux: Vec<String>,
}

/// The scheduling authority. Passive: it only ever answers worker calls,
/// never retries and never blocks a requester waiting for work.
///
/// All ledger mutation happens inside one mutex held for the in-memory
/// transition only; handlers never await while holding it.
#[derive(Debug)]
pub struct MapReduceCoordinator {
    ledger: Arc<Mutex<TaskLedger>>,
    job: JobSpec,
}

impl MapReduceCoordinator {
    pub fn new(ledger: Arc<Mutex<TaskLedger>>, job: JobSpec) -> Self {
        Self { ledger, job }
    }

    /// True once every map and reduce task has completed.
    ///
    /// Exposed for the process-lifetime watcher and for tests; request
    /// handling recomputes the phase from the ledger directly instead of
    /// relying on this.
    pub async fn is_done(&self) -> bool {
        self.ledger.lock().await.is_done()
    }

    fn task_reply(&self, assignment: Assignment) -> TaskReply {
        let kind = match assignment.kind {
            ledger::TaskKind::Map => TaskKind::Map,
            ledger::TaskKind::Reduce => TaskKind::Reduce,
        };

        TaskReply {
            kind: kind as i32,
            task_id: assignment.task_id,
            input_file: assignment.input_file,
            n_map: assignment.n_map,
            n_reduce: assignment.n_reduce,
            workload: self.job.workload.clone(),
            aux: self.job.aux.clone(),
        }
    }

    fn signal_reply(kind: TaskKind) -> TaskReply {
        TaskReply {
            kind: kind as i32,
            ..Default::default()
        }
    }
}

#[tonic::async_trait]
impl Coordinator for MapReduceCoordinator {
    async fn request_task(
        &self,
        request: Request<TaskRequest>,
    ) -> Result<Response<TaskReply>, Status> {
        let worker_id = request.into_inner().worker_id;

        let mut ledger = self.ledger.lock().await;
        let now = Instant::now();

        // Reduce work is never offered while any map task is incomplete,
        // even if a reduce slot is idle: reduce tasks read every map
        // task's output.
        let reply = match ledger.phase() {
            Phase::Done => Self::signal_reply(TaskKind::JobComplete),
            Phase::Map => match ledger.next_map_task(now) {
                Some(assignment) => self.task_reply(assignment),
                None => Self::signal_reply(TaskKind::NoWork),
            },
            Phase::Reduce => match ledger.next_reduce_task(now) {
                Some(assignment) => self.task_reply(assignment),
                None => Self::signal_reply(TaskKind::NoWork),
            },
        };

        debug!(
            worker_id,
            kind = ?reply.kind(),
            task_id = reply.task_id,
            "served task request"
        );
        Ok(Response::new(reply))
    }

    async fn report_completion(
        &self,
        request: Request<CompletionRequest>,
    ) -> Result<Response<CompletionReply>, Status> {
        let report = request.into_inner();

        // Duplicate, late and out-of-range reports are accepted no-ops;
        // the worker id is logged but not validated against the claimant.
        let kind = match report.kind() {
            TaskKind::Map => Some(ledger::TaskKind::Map),
            TaskKind::Reduce => Some(ledger::TaskKind::Reduce),
            TaskKind::NoWork | TaskKind::JobComplete => None,
        };

        if let Some(kind) = kind {
            let mut ledger = self.ledger.lock().await;
            ledger.mark_completed(kind, report.task_id);

            info!(
                worker_id = report.worker_id,
                ?kind,
                task_id = report.task_id,
                phase = ?ledger.phase(),
                "recorded task completion"
            );
        }

        Ok(Response::new(CompletionReply { acknowledged: true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn coordinator(inputs: &[&str], n_reduce: u32) -> MapReduceCoordinator {
        let ledger = Arc::new(Mutex::new(TaskLedger::new(
            inputs.iter().map(|s| s.to_string()).collect(),
            n_reduce,
            Duration::from_secs(10),
        )));
        MapReduceCoordinator::new(
            ledger,
            JobSpec {
                workload: "wc".to_string(),
                aux: vec!["aux-arg".to_string()],
            },
        )
    }

    async fn request(c: &MapReduceCoordinator) -> TaskReply {
        c.request_task(Request::new(TaskRequest { worker_id: 1 }))
            .await
            .unwrap()
            .into_inner()
    }

    async fn report(c: &MapReduceCoordinator, kind: TaskKind, task_id: u32) -> CompletionReply {
        c.report_completion(Request::new(CompletionRequest {
            kind: kind as i32,
            task_id,
            worker_id: 1,
        }))
        .await
        .unwrap()
        .into_inner()
    }

    #[tokio::test]
    async fn no_reduce_leaks_out_while_maps_are_incomplete() {
        let c = coordinator(&["a.txt", "b.txt"], 2);

        let first = request(&c).await;
        assert_eq!(first.kind(), TaskKind::Map);
        assert_eq!(first.input_file, "a.txt");
        assert_eq!((first.n_map, first.n_reduce), (2, 2));
        assert_eq!(first.workload, "wc");
        assert_eq!(first.aux, vec!["aux-arg"]);

        assert_eq!(request(&c).await.kind(), TaskKind::Map);

        // all maps claimed but unfinished: the answer is NoWork, never a
        // reduce task and never a blocked call
        assert_eq!(request(&c).await.kind(), TaskKind::NoWork);

        report(&c, TaskKind::Map, 0).await;
        assert_eq!(request(&c).await.kind(), TaskKind::NoWork);

        report(&c, TaskKind::Map, 1).await;
        let reduce = request(&c).await;
        assert_eq!(reduce.kind(), TaskKind::Reduce);
        assert_eq!(reduce.input_file, "");
    }

    #[tokio::test]
    async fn job_complete_is_served_once_everything_is_reported() {
        let c = coordinator(&["a.txt"], 1);

        let map = request(&c).await;
        assert_eq!(map.kind(), TaskKind::Map);
        report(&c, TaskKind::Map, map.task_id).await;

        let reduce = request(&c).await;
        assert_eq!(reduce.kind(), TaskKind::Reduce);
        report(&c, TaskKind::Reduce, reduce.task_id).await;

        assert!(c.is_done().await);
        assert_eq!(request(&c).await.kind(), TaskKind::JobComplete);

        // terminal state is stable for every later poller
        assert_eq!(request(&c).await.kind(), TaskKind::JobComplete);
    }

    #[tokio::test]
    async fn odd_reports_are_acknowledged_without_effect() {
        let c = coordinator(&["a.txt"], 1);

        // out-of-range id
        assert!(report(&c, TaskKind::Map, 42).await.acknowledged);
        assert!(!c.is_done().await);
        assert_eq!(request(&c).await.kind(), TaskKind::Map);

        // duplicate completion
        assert!(report(&c, TaskKind::Map, 0).await.acknowledged);
        assert!(report(&c, TaskKind::Map, 0).await.acknowledged);
        assert_eq!(request(&c).await.kind(), TaskKind::Reduce);

        // a completion report for a signal kind is meaningless; absorbed
        assert!(report(&c, TaskKind::JobComplete, 0).await.acknowledged);
        assert!(!c.is_done().await);
    }
}
