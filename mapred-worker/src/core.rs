//
// Import gRPC stubs/definitions.
//
pub use coordinator::{
    coordinator_client::CoordinatorClient, CompletionRequest, TaskKind, TaskReply, TaskRequest,
};
pub mod coordinator {
    tonic::include_proto!("coordinator");
}

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tonic::transport::Channel;
use tracing::{debug, info, warn};

use crate::{map, reduce};

/// Everything the worker loop needs to run against one coordinator.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Address of the coordinator server, e.g. `http://[::1]:8030`.
    pub coordinator: String,

    /// Directory holding intermediate buckets and final output files.
    pub work_dir: PathBuf,

    /// Sleep between polls while the coordinator has no task to offer.
    pub poll_interval: Duration,
}

/// Poll the coordinator for work until the job completes or the
/// transport fails.
///
/// Transport loss is treated as "the job is over": once everything
/// completes the coordinator shuts itself down, so a dead connection is
/// how a slow poller learns about it. The worker does not retry the
/// transport.
pub async fn run(config: WorkerConfig) -> Result<()> {
    let worker_id = std::process::id();

    let mut client = match CoordinatorClient::connect(config.coordinator.clone()).await {
        Ok(client) => client,
        Err(e) => {
            warn!(
                worker_id,
                "unable to reach coordinator at {}: {e}", config.coordinator
            );
            return Ok(());
        }
    };

    info!(worker_id, "worker started, polling for tasks");

    loop {
        let request = tonic::Request::new(TaskRequest { worker_id });
        let reply = match client.request_task(request).await {
            Ok(response) => response.into_inner(),
            Err(status) => {
                info!(worker_id, "coordinator unreachable ({status}), exiting");
                return Ok(());
            }
        };

        match reply.kind() {
            TaskKind::JobComplete => {
                info!(worker_id, "job complete, exiting");
                return Ok(());
            }
            TaskKind::NoWork => {
                debug!(worker_id, "no task available, backing off");
                tokio::time::sleep(config.poll_interval).await;
            }
            TaskKind::Map => {
                map::perform_map(&reply, &config.work_dir).await?;
                report_completion(&mut client, &reply, worker_id).await?;
            }
            TaskKind::Reduce => {
                reduce::perform_reduce(&reply, &config.work_dir).await?;
                report_completion(&mut client, &reply, worker_id).await?;
            }
        }
    }
}

async fn report_completion(
    client: &mut CoordinatorClient<Channel>,
    task: &TaskReply,
    worker_id: u32,
) -> Result<()> {
    let request = tonic::Request::new(CompletionRequest {
        kind: task.kind,
        task_id: task.task_id,
        worker_id,
    });
    client.report_completion(request).await?;

    debug!(worker_id, task_id = task.task_id, "completion reported");
    Ok(())
}
