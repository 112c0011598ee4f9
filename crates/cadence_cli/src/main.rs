//! Cadence CLI
//!
//! # Commands
//! - `cadence simulate [path]` - Run a scene on a virtual clock and print its timeline
//! - `cadence check [path]` - Validate a scene without running it
//! - `cadence init [path]` - Write a sample scene

mod config;
mod project;
mod simulate;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::SceneConfig;
use crate::simulate::SimulationReport;

/// Cadence animator flow simulator
#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about = "Simulate animator trees from scene files")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scene and print every state change
    Simulate {
        /// Scene file or directory containing cadence.toml
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Stop at this virtual time (ms) instead of running until idle
        #[arg(long)]
        until: Option<u64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a scene
    Check {
        /// Scene file or directory containing cadence.toml
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Print the normalized scene
        #[arg(long)]
        print: bool,
    },

    /// Create a sample scene
    Init {
        /// Target directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing cadence.toml
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Simulate { path, until, json } => run_simulate_command(&path, until, json),
        Commands::Check { path, print } => run_check_command(&path, print),
        Commands::Init { path, force } => {
            let scene_path = project::create_scene(&path, force)?;
            println!("Created {}", scene_path.display());
            println!("Run `cadence simulate {}` to play it.", path.display());
            Ok(())
        }
    }
}

fn run_simulate_command(path: &Path, until: Option<u64>, json: bool) -> Result<()> {
    let scene = SceneConfig::load(path)?;
    tracing::debug!(nodes = scene.nodes.len(), events = scene.events.len(), "scene loaded");

    let report = simulate::run_scene(&scene, until)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn run_check_command(path: &Path, print: bool) -> Result<()> {
    let scene = SceneConfig::load(path)?;
    if print {
        print!("{}", scene.to_toml()?);
    }
    println!(
        "Scene OK: {} nodes, {} events",
        scene.nodes.len(),
        scene.events.len()
    );
    Ok(())
}

fn print_report(report: &SimulationReport) {
    let width = report
        .timeline
        .iter()
        .map(|entry| entry.node.len())
        .max()
        .unwrap_or(0);

    for entry in &report.timeline {
        println!(
            "{:>6}ms  {:<width$}  {} -> {}",
            entry.at_ms,
            entry.node,
            entry.from,
            entry.to,
            width = width
        );
    }

    println!();
    println!("Finished at {}ms", report.end_ms);
    for node in &report.nodes {
        println!("  {}: {}", node.node, node.state);
    }
}
