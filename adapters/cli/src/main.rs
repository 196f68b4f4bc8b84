#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays headless Tank Arena matches.

mod scenario;
mod simulation;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{scenario::Scenario, simulation::Simulation};

/// Greeting printed ahead of text reports.
const WELCOME_BANNER: &str = "Welcome to Tank Arena.";

/// Runs tank arena matches without a renderer and reports the results.
#[derive(Debug, Parser)]
#[command(name = "tank-arena", version, about, long_about = None)]
struct Cli {
    /// Scenario file in TOML format. The built-in skirmish is used when omitted.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Overrides the scenario seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides the tick budget per match.
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Overrides the simulated milliseconds per tick.
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Number of matches to play, each with the next seed.
    #[arg(long, default_value_t = 1)]
    rounds: u32,

    /// Report format written to stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log filter directive such as `debug` or `agents=trace`. Defaults to `RUST_LOG`, then `info`.
    #[arg(long)]
    log_level: Option<String>,

    /// Prints the resolved scenario as TOML and exits.
    #[arg(long)]
    print_scenario: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Entry point for the Tank Arena command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;

    let mut scenario = match &cli.scenario {
        Some(path) => Scenario::load(path)
            .with_context(|| format!("failed to load scenario {}", path.display()))?,
        None => Scenario::skirmish(),
    };
    if let Some(seed) = cli.seed {
        scenario.seed = seed;
    }
    if let Some(max_ticks) = cli.max_ticks {
        scenario.max_ticks = max_ticks;
    }
    if let Some(tick_ms) = cli.tick_ms {
        scenario.tick_ms = tick_ms;
    }
    scenario
        .validate()
        .context("command-line overrides produced an invalid scenario")?;

    if cli.print_scenario {
        print!(
            "{}",
            toml::to_string_pretty(&scenario).context("failed to encode scenario")?
        );
        return Ok(());
    }

    let mut simulation = Simulation::new(&scenario).context("failed to prepare the match")?;
    info!(seed = scenario.seed, rounds = cli.rounds, "starting");

    let mut reports = Vec::new();
    for round in 0..cli.rounds.max(1) {
        if round > 0 {
            simulation.restart(scenario.seed.wrapping_add(u64::from(round)));
        }
        reports.push(simulation.run());
    }

    match cli.format {
        OutputFormat::Text => {
            println!("{WELCOME_BANNER}");
            for report in &reports {
                println!("{report}");
            }
        }
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&reports).context("failed to encode match reports")?;
            println!("{json}");
        }
    }

    Ok(())
}

fn init_tracing(directive: Option<&str>) -> Result<()> {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter '{directive}'"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
