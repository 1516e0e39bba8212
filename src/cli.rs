use clap::Parser;
use std::path::PathBuf;

use upload_tracker::utils::version;

#[derive(Parser, Debug)]
#[command(author, version = version(), about)]
pub struct Cli {
    /// Files to upload into the blob store
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Settings file layered over the default config.toml
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Close all uploads still in flight after this many milliseconds
    #[arg(long, value_name = "MS")]
    pub cancel_after_ms: Option<u64>,
}
