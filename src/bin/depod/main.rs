//! depod CLI - remove CocoaPods integration from Xcode projects

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use depod::util::Shell;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("depod=debug")
    } else {
        EnvFilter::new("depod=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    // Execute command
    match cli.command {
        Commands::Deintegrate(args) => {
            let shell = Shell::from_flags(cli.quiet, cli.verbose, cli.color, args.json);
            commands::deintegrate::execute(&shell, args)
        }
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
