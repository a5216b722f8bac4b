use clap::Parser;
use std::path::PathBuf;
use shared::types::AggregationMode;

#[derive(Parser, Debug)]
#[command(name = "gatewatchd")]
#[command(about = "Rolling DNS and traffic summaries for a small gateway", long_about = None)]
pub struct Cli {
    /// Path to config file (default: /etc/gatewatch/gatewatchd.toml, if present)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Interface handed to the capture command
    #[arg(long, short)]
    pub interface: Option<String>,

    /// Window length in seconds
    #[arg(long, short = 'w', value_name = "SECS")]
    pub interval: Option<u64>,

    /// Destinations listed per source (pair-sum mode)
    #[arg(long, short = 'n', value_name = "N")]
    pub top: Option<usize>,

    /// Aggregation mode (unique-set, count, pair-sum)
    #[arg(long, short)]
    pub mode: Option<AggregationMode>,

    /// Read capture lines from stdin instead of spawning the capture command
    #[arg(long)]
    pub stdin: bool,

    /// Run the capture command through sudo
    #[arg(long)]
    pub sudo: bool,
}
