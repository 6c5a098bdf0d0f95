use std::path::Path;

use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use criprof::cli::{self, Command, HintsArgs};
use criprof::config::Config;
use criprof::logging::{self, Verbosity};
use criprof::output::{Inventory, OutputFormatter};
use criprof::probe::Accessors;
use criprof::Context;
use tracing::{debug, warn};

fn main() -> Result<()> {
    let args = cli::Args::parse();
    logging::init(Verbosity::from_flags(args.verbose, args.quiet));

    match args.command {
        Command::Version => {
            println!("{}", cli::version_string());
            Ok(())
        }
        Command::Hints(hints) => run_hints(args.config.as_deref(), &hints),
    }
}

fn run_hints(config_path: Option<&Path>, hints: &HintsArgs) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;

    let engine = config.engine(&Accessors::system(), hints.fast);
    debug!(probes = ?engine.probe_names(), "probe roster");

    let ctx = match hints.timeout().or(config.deadline()) {
        Some(timeout) => Context::timeout(timeout),
        None => Context::background(),
    };

    let inventory = engine.detect_all(&ctx).unwrap_or_else(|err| {
        warn!("{err}, reporting nothing");
        Inventory::fallback()
    });

    println!("{}", OutputFormatter::format(&inventory, hints.format));
    Ok(())
}
