use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "criprof")]
#[command(about = "Report the container runtime, scheduler and image format of this process", long_about = None)]
pub struct Args {
    /// Config file (defaults to ~/.criprof.yaml)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Print the detected environment
    Hints(HintsArgs),

    /// Print the version
    Version,
}

#[derive(clap::Args, Debug, PartialEq, Eq)]
pub struct HintsArgs {
    /// Output format
    #[arg(short = 'f', long, default_value = "json")]
    pub format: OutputFormat,

    /// Skip network probes
    #[arg(long)]
    pub fast: bool,

    /// Overall deadline in milliseconds (overrides the config file)
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: Option<u64>,
}

impl HintsArgs {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

pub fn version_string() -> String {
    format!("criprof version {}", env!("CARGO_PKG_VERSION"))
}
