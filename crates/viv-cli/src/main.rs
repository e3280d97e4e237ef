//! Command-line runner for the Vivarium demo ecosystem.

mod commands;
mod ecosystem;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::simulate::SimulateOptions;

#[derive(Parser)]
#[command(
    name = "viv",
    about = "Vivarium — a tick-based ecosystem simulation",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the demo ecosystem headless and print a census
    Simulate {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "600")]
        ticks: u64,

        /// RNG seed for deterministic runs (overrides the config file)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Target ticks per second (overrides the config file)
        #[arg(long)]
        tick_rate: Option<f64>,

        /// Synthetic milliseconds between frame callbacks (default: one frame interval)
        #[arg(long)]
        frame_ms: Option<f64>,

        /// Species table JSON file (default: built-in plants, grazers and hunters)
        #[arg(long)]
        species: Option<PathBuf>,

        /// Simulation config JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the final snapshot as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Show the full event log
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the species table
    Species {
        /// Species table JSON file (default: built-in table)
        #[arg(long)]
        species: Option<PathBuf>,
    },
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate {
            ticks,
            seed,
            tick_rate,
            frame_ms,
            species,
            config,
            json,
            verbose,
        } => commands::simulate::run(&SimulateOptions {
            ticks,
            seed,
            tick_rate,
            frame_ms,
            species: species.as_deref(),
            config: config.as_deref(),
            json,
            verbose,
        }),
        Commands::Species { species } => commands::species::run(species.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
