use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod detect;
pub mod ports;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Acquire from configured or auto-detected dataloggers.
    Run(RunArgs),
    /// Find attached dataloggers by scoring and live-testing serial ports.
    Detect(DetectArgs),
    /// List the host's serial ports with likelihood scores.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub async fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format).await,
        Command::Detect(args) => detect::run(args, format).await,
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Config file (JSON). Auto-detects dataloggers when absent or invalid.
    #[arg(long, value_name = "PATH", env = "THERMOLINK_CONFIG")]
    pub config: Option<PathBuf>,
    /// Seconds between snapshot prints.
    #[arg(long, default_value = "5")]
    pub interval: u64,
    /// Per-port auto-detection budget in seconds.
    #[arg(long, default_value = "30")]
    pub budget: u64,
    /// Write a starter config to PATH and exit.
    #[arg(long, value_name = "PATH", conflicts_with = "config")]
    pub write_example: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Per-port live test budget in seconds.
    #[arg(long, default_value = "30")]
    pub budget: u64,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug, Default)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}
