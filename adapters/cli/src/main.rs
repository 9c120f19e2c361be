#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays Underpromotion puzzle scenarios.

mod scenario;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::scenario::Scenario;

/// Command-line arguments accepted by the scenario runner.
#[derive(Debug, Parser)]
#[command(name = "underpromotion", about = "Replays chess puzzle scenarios")]
struct CliArgs {
    /// Scenario file describing the map, rules and input script.
    #[arg(long, value_name = "PATH")]
    scenario: PathBuf,
    /// Log filter passed to env_logger, for example `debug` or `underpromotion_world=trace`.
    #[arg(long, value_name = "FILTER", default_value = "info")]
    log_level: String,
}

/// Entry point for the Underpromotion command-line interface.
fn main() -> Result<()> {
    let args = CliArgs::parse();
    env_logger::Builder::new()
        .parse_filters(&args.log_level)
        .init();

    let scenario = Scenario::from_path(&args.scenario)?;
    let summary = scenario.run();

    println!(
        "ticks: {}  events: {}  rejected moves: {}",
        summary.ticks, summary.events, summary.rejected_moves
    );
    println!("player: ({}, {})", summary.player.x, summary.player.y);
    if summary.deaths.is_empty() {
        println!("deaths: none");
    } else {
        println!("deaths: {:?}", summary.deaths);
    }
    Ok(())
}
