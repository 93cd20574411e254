#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Skirmish scenarios headlessly.

mod scenario;
mod simulation;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::{scenario::Scenario, simulation::Summary};

/// Runs a fighter skirmish without rendering and reports what happened.
#[derive(Debug, Parser)]
#[command(name = "skirmish", version, about)]
struct Args {
    /// TOML scenario file. The built-in scenario is used when omitted.
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Number of ticks to simulate.
    #[arg(long)]
    ticks: Option<u64>,
    /// Length of a tick in milliseconds.
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Seed for every random stream in the run.
    #[arg(long)]
    seed: Option<u64>,
    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
    /// Log filter directives. Falls back to `RUST_LOG`, then `info`.
    #[arg(long)]
    log: Option<String>,
}

/// Entry point for the Skirmish command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log.as_deref())?;

    let mut scenario = match &args.scenario {
        Some(path) => Scenario::load(path)
            .with_context(|| format!("loading scenario {}", path.display()))?,
        None => Scenario::default(),
    };
    if let Some(ticks) = args.ticks {
        scenario.ticks = ticks;
    }
    if let Some(tick_ms) = args.tick_ms {
        scenario.tick_ms = tick_ms;
    }
    if let Some(seed) = args.seed {
        scenario.seed = seed;
    }
    scenario.validate().context("invalid scenario")?;

    tracing::info!(
        ticks = scenario.ticks,
        tick_ms = scenario.tick_ms,
        seed = scenario.seed,
        "starting simulation"
    );
    let summary = simulation::run(&scenario);

    if args.json {
        let rendered =
            serde_json::to_string_pretty(&summary).context("serializing run summary")?;
        println!("{rendered}");
    } else {
        print_summary(&summary);
    }

    Ok(())
}

fn init_tracing(directives: Option<&str>) -> Result<()> {
    let filter = match directives {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter `{directives}`"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn print_summary(summary: &Summary) {
    println!(
        "simulated {} ticks ({:.1}s)",
        summary.ticks, summary.simulated_seconds
    );
    println!(
        "spawned {} | attacks {} | deaths {} | despawned {} | rejected spawns {}",
        summary.tally.spawned,
        summary.tally.attacks,
        summary.tally.deaths,
        summary.tally.despawned,
        summary.tally.rejected_spawns,
    );
    println!("live agents: {}", summary.live_agents);
    for (state, count) in &summary.agents_by_state {
        println!("  {state}: {count}");
    }
    for spawner in &summary.spawners {
        println!(
            "spawner {}: {} active, {}",
            spawner.id, spawner.active, spawner.phase
        );
    }
}
