#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::lib_net::DEFAULT_IPERF_BIN;

#[derive(Parser, Debug)]
#[command(
    name = "chimp-stress",
    version,
    about = "Consume a percentage of RAM or disk, a number of CPU cores, or network throughput for a number of seconds, then release it"
)]
pub struct Cli {
    #[command(flatten)]
    pub stress: StressArgs,

    /// File that receives a plain-text copy of the log.
    #[arg(long, env = "STRESS_LOG_FILE", default_value = "stress_test.log")]
    pub log_file: PathBuf,

    /// Serve /healthz, /status and /metrics on this address while the test runs.
    #[arg(long, env = "STRESS_LISTEN")]
    pub listen: Option<String>,

    /// Throughput client used by the network test.
    #[arg(long, env = "STRESS_IPERF_BIN", default_value = DEFAULT_IPERF_BIN)]
    pub iperf_bin: String,
}

/// Raw test parameters. Checked by [`crate::validation::validate_args`].
#[derive(Args, Debug, Clone, Default)]
pub struct StressArgs {
    /// The test to run: ram, hdd, cpu or net.
    #[arg(short = 't', long = "test", value_name = "ram|hdd|cpu|net")]
    pub test: String,

    /// Seconds to hold the resource before releasing it and exiting.
    #[arg(short = 's', long = "seconds", allow_negative_numbers = true)]
    pub seconds: Option<i64>,

    /// Total percent of RAM or disk to consume (ram, hdd).
    #[arg(short = 'p', long = "percent", allow_negative_numbers = true)]
    pub percent: Option<i64>,

    /// Comma separated mount points to fill (hdd). Trailing slash is optional.
    #[arg(short = 'v', long = "volumes", value_delimiter = ',')]
    pub volumes: Vec<String>,

    /// Cores to saturate (cpu). Larger than the core count means all cores.
    #[arg(short = 'c', long = "core_count", allow_negative_numbers = true)]
    pub core_count: Option<i64>,

    /// Interface to drive traffic on, e.g. eth0 (net).
    #[arg(short = 'i', long = "interface")]
    pub interface: Option<String>,

    /// Host running the throughput server (net).
    #[arg(short = 'n', long = "hostname")]
    pub hostname: Option<String>,
}
