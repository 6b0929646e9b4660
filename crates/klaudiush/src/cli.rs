//! CLI argument definitions

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "klaudiush")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version(VersionArgs),

    /// Update klaudiush to the latest or a specific release
    Update(UpdateArgs),
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Check for updates only
    #[arg(long)]
    pub check: bool,

    /// Act on every klaudiush found on PATH, not just this one
    #[arg(long)]
    pub all: bool,

    /// Install a specific version (e.g. 1.13.0 or v1.13.0)
    #[arg(long, value_name = "VERSION")]
    pub to: Option<String>,

    /// Output check results as JSON
    #[arg(long, requires = "check")]
    pub json: bool,
}
