use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use round_robin_sim::sim::{self, DEFAULT_BENCH_RUNS, DEFAULT_MAX_CYCLES};
use round_robin_sim::{Settings, SettingsConfig, SimError, logging};

/// Round-robin task scheduling simulator.
#[derive(Parser, Debug)]
#[command(name = "round_robin_sim", version, about)]
struct Cli {
    /// Settings file (TOML). Defaults are used when it does not exist.
    #[arg(
        long,
        global = true,
        env = "ROUND_ROBIN_CONFIG",
        default_value = "round_robin.toml"
    )]
    config: PathBuf,

    /// Seed for worker/task generation and the migration coin. Random when omitted.
    #[arg(long, global = true, env = "ROUND_ROBIN_SEED")]
    seed: Option<u64>,

    /// Raise log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Step a generated pool until every task completes (default).
    Demo {
        /// Stop after this many cycles even if tasks remain.
        #[arg(long, default_value_t = DEFAULT_MAX_CYCLES)]
        max_cycles: u64,
    },
    /// Timer-driven run printing completions as they happen.
    Live {
        /// Stop after this many cycles.
        #[arg(long, default_value_t = 30)]
        cycles: u64,
        /// Override the timer period from the settings file.
        #[arg(long)]
        period_ms: Option<u64>,
        /// Pause once at this cycle, print the worker list, then resume.
        #[arg(long)]
        pause_after: Option<u64>,
    },
    /// Show one worker's queue after some cycles (lists all workers without a name).
    Worker {
        name: Option<String>,
        /// Cycles to run before inspecting.
        #[arg(long, default_value_t = 0)]
        after: u64,
    },
    /// Drain several seeded runs and print CSV throughput.
    Bench {
        #[arg(long, default_value_t = DEFAULT_BENCH_RUNS)]
        runs: usize,
    },
    /// Sweep worker/task counts and print CSV throughput.
    Stress {
        #[arg(long, default_value_t = 5)]
        runs: usize,
        /// Comma-separated worker counts (e.g. 1,2,8).
        #[arg(long, value_delimiter = ',')]
        workers: Option<Vec<u32>>,
        /// Comma-separated task counts (e.g. 10,100).
        #[arg(long, value_delimiter = ',')]
        tasks: Option<Vec<u32>>,
    },
    /// Print the effective settings as TOML.
    Config {
        /// Also write them to the settings file.
        #[arg(long)]
        save: bool,
    },
}

fn execute(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load_or_default(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    let seed = cli.seed.unwrap_or_else(rand::random);
    info!("[CLI] seed={seed}");

    match cli.command.unwrap_or(Command::Demo {
        max_cycles: DEFAULT_MAX_CYCLES,
    }) {
        Command::Demo { max_cycles } => {
            sim::run_demo(settings, seed, max_cycles).context("demo failed")?
        }
        Command::Live {
            cycles,
            period_ms,
            pause_after,
        } => {
            let settings = match period_ms {
                Some(period_ms) => Settings::new(SettingsConfig {
                    timer_period_ms: period_ms,
                    ..settings.to_config()
                })?,
                None => settings,
            };
            sim::run_live(settings, seed, cycles, pause_after).context("live run failed")?
        }
        Command::Worker { name, after } => {
            sim::show_worker(settings, seed, name.as_deref(), after)?
        }
        Command::Bench { runs } => {
            sim::run_benchmark(settings, seed, runs).context("benchmark failed")?
        }
        Command::Stress {
            runs,
            workers,
            tasks,
        } => sim::run_stress(settings, seed, runs, workers, tasks).context("stress failed")?,
        Command::Config { save } => {
            print!("{}", settings.to_toml()?);
            if save {
                settings
                    .save(&cli.config)
                    .with_context(|| format!("saving settings to {}", cli.config.display()))?;
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            let configuration = err
                .downcast_ref::<SimError>()
                .is_some_and(SimError::is_configuration);
            if configuration {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
