mod args;

use std::time::Duration;

use clap::Parser;

use args::Args;
use mapred_worker::core::{run, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    run(WorkerConfig {
        coordinator: args.address,
        work_dir: args.work_dir,
        poll_interval: Duration::from_secs(args.poll_interval),
    })
    .await
}
