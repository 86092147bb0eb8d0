mod checkpoint;
mod config;
mod distribution;
mod driver;
mod error;
mod estimator;
mod logging;

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};

use config::{RawConfig, RunConfig};
use distribution::DistributionFile;
use estimator::{Estimator, EstimatorAnswer, EstimatorQuery};

/// Empirically estimates Kolmogorov complexity of short binary strings via
/// the Coding Theorem Method: enumerate small Turing machines, simulate
/// each on a blank tape, and derive K(s) = -log2 D(s) from the resulting
/// output-frequency distribution.
#[derive(Parser, Debug)]
#[command(name = "ctm", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute (or resume) a CTM computation and write its distribution.
    Run(RunArgs),
    /// Answer K(s) for one or more strings from a saved distribution.
    Query(QueryArgs),
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Resume from the configured checkpoint path rather than starting fresh.
    #[arg(long)]
    resume: bool,

    /// Override the checkpoint path from the config file.
    #[arg(long)]
    checkpoint: Option<String>,

    /// Override the number of worker processes/threads from the config file.
    #[arg(long)]
    num_processes: Option<usize>,

    /// Override the log level (error/warn/info/debug/trace).
    #[arg(short, long)]
    verbose: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct QueryArgs {
    /// Path to a distribution JSON file written by `ctm run`.
    #[arg(long)]
    distribution: PathBuf,

    /// One or more binary strings to query.
    strings: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_command(args),
        Command::Query(args) => query_command(args),
    }
}

fn run_command(args: RunArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading config file {}", args.config.display()))?;
    let file_config = RawConfig::from_toml_str(&text).context("parsing config file")?;
    let overrides = RawConfig {
        checkpoint_path: args.checkpoint.clone(),
        num_processes: args.num_processes,
        log_level: args.verbose.clone(),
        ..Default::default()
    };
    let merged = file_config.merge_overrides(overrides);
    let config = RunConfig::validate(merged).context("validating configuration")?;

    logging::init(&config.log_level);

    let outcome = driver::run(&config, args.resume).context("running CTM computation")?;

    let non_halting: HashMap<String, u64> = outcome
        .aggregator
        .non_halt()
        .iter()
        .map(|(reason, count)| (format!("{reason:?}"), *count))
        .collect();
    let halting_total: u64 = outcome.aggregator.counts().values().sum();

    let (distribution, raw_counts) = if config.save_raw_counts {
        (None, Some(outcome.aggregator.counts().clone()))
    } else {
        (Some(outcome.aggregator.finalise()), None)
    };

    let file = DistributionFile {
        n: config.n_states,
        m: 2,
        max_runtime_steps: config.max_runtime_steps,
        blank_symbol: config.blank_symbol,
        enumeration: if config.use_reduced_enumeration {
            "reduced".to_string()
        } else {
            "raw".to_string()
        },
        completion_applied: config.use_reduced_enumeration,
        halting_total,
        non_halting,
        distribution,
        raw_counts,
    };
    file.write(std::path::Path::new(&config.output_path))
        .with_context(|| format!("writing distribution to {}", config.output_path))?;

    Ok(())
}

fn query_command(args: QueryArgs) -> Result<()> {
    logging::init("info");
    let file = DistributionFile::read(&args.distribution)
        .with_context(|| format!("reading distribution file {}", args.distribution.display()))?;
    let estimator = Estimator::new(file);

    for string in &args.strings {
        let query = EstimatorQuery {
            string: string.clone(),
        };
        match estimator.answer(&query)? {
            EstimatorAnswer::Bits(bits) => println!("{string}: {bits:.4} bits"),
            EstimatorAnswer::Unseen => println!("{string}: unseen"),
        }
    }
    Ok(())
}
