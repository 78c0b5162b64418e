//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use depod::util::ColorChoice;

/// depod - remove CocoaPods integration from Xcode projects
#[derive(Parser)]
#[command(name = "depod")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress everything except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output: auto, always, or never
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Remove CocoaPods integration from a project
    Deintegrate(DeintegrateArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct DeintegrateArgs {
    /// Path to the .xcodeproj bundle (defaults to the single project in
    /// the current directory)
    pub project: Option<PathBuf>,

    /// Leave Podfile, Podfile.lock, and the Pods/ directory on disk
    #[arg(long)]
    pub keep_sources: bool,

    /// Leave the generated .xcworkspace bundle on disk
    #[arg(long)]
    pub keep_workspace: bool,

    /// Never remove orphaned satellite targets
    #[arg(long)]
    pub keep_orphaned_targets: bool,

    /// Emit a machine-readable JSON report instead of status output
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
