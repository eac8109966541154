//! snitchdiff CLI
//!
//! Command-line driver for the diff viewer engine

use clap::{Parser, Subcommand};
use snitchdiff_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "snitchdiff")]
#[command(about = "snitchdiff - Incremental structural diff viewer", long_about = None)]
struct Cli {
    /// Emit JSON logs instead of human-readable ones
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load a diff from fixtures and print the laid-out tree
    Render(commands::render::RenderArgs),
    /// Load a diff from fixtures and print one node's property table
    Detail(commands::detail::DetailArgs),
}

fn main() {
    let cli = Cli::parse();

    init(if cli.json_logs {
        Profile::Production
    } else {
        Profile::Development
    });

    let result = match cli.command {
        Commands::Render(args) => commands::render::execute(args),
        Commands::Detail(args) => commands::detail::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
