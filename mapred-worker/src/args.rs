use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The address of the coordinator server.
    #[arg(short = 'j', long = "join", default_value = "http://[::1]:8030")]
    pub address: String,

    /// Directory for intermediate buckets and final output files.
    #[arg(short, long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Seconds to sleep between polls when no task is available.
    #[arg(long, default_value_t = common::DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval: u64,
}
