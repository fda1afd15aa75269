mod args;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::info;

use args::Args;
use mapred_coordinator::core::{CoordinatorServer, JobSpec, MapReduceCoordinator};
use mapred_coordinator::ledger::TaskLedger;

/// How long the server lingers after the last task completes, so workers
/// polling at the default interval still observe the JobComplete signal
/// before the socket closes.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3 * common::DEFAULT_POLL_INTERVAL_SECS);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let addr: SocketAddr = format!("[::1]:{}", args.port).parse()?;

    let ledger = Arc::new(Mutex::new(TaskLedger::new(
        args.inputs,
        args.n_reduce,
        Duration::from_secs(args.task_timeout),
    )));

    let coordinator = MapReduceCoordinator::new(
        ledger.clone(),
        JobSpec {
            workload: args.workload,
            aux: args.aux,
        },
    );

    let shutdown = CancellationToken::new();
    let watcher = {
        let ledger = ledger.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                if ledger.lock().await.is_done() {
                    break;
                }
            }
            info!("all tasks completed, shutting down");
            tokio::time::sleep(SHUTDOWN_GRACE).await;
            shutdown.cancel();
        })
    };

    info!("CoordinatorServer listening on {}", addr);

    Server::builder()
        .add_service(CoordinatorServer::new(coordinator))
        .serve_with_shutdown(addr, shutdown.cancelled())
        .await?;

    watcher.await?;

    Ok(())
}
