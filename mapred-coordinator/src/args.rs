use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The port for the server to run on.
    #[arg(short, long, default_value = "8030")]
    pub port: u16,

    /// Number of reduce partitions for the job.
    #[arg(short = 'r', long, default_value = "10")]
    pub n_reduce: u32,

    /// Name of the MapReduce application to run.
    #[arg(short, long)]
    pub workload: String,

    /// Seconds of worker silence before an in-progress task is
    /// reassigned.
    #[arg(long, default_value_t = common::DEFAULT_TASK_TIMEOUT_SECS)]
    pub task_timeout: u64,

    /// Input files, one map task each.
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Auxiliary arguments to pass to the MapReduce application.
    #[clap(value_parser, last = true)]
    pub aux: Vec<String>,
}
