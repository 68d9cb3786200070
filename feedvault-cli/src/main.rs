// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! FeedVault CLI - feed post archiving from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Poll two subreddits continuously
//! feedvault --sources rust,programming run
//!
//! # One polling cycle, then exit (cron-friendly)
//! feedvault --sources rust once
//!
//! # Historical backfill for one source
//! feedvault backfill rust --budget 2000
//!
//! # Archive statistics
//! feedvault stats
//!
//! # Hashtag monitoring (needs FEEDVAULT_BEARER_TOKEN)
//! feedvault --upstream microblog --sources rustlang run
//! ```

mod commands;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{backfill, once, run, stats};

// ============================================================================
// CLI Definition
// ============================================================================

/// FeedVault CLI - incremental feed post archiving.
#[derive(Parser)]
#[command(name = "feedvault")]
#[command(about = "Feed post archiving CLI")]
#[command(long_about = r"
FeedVault archives posts from feed upstreams into a local SQLite
database, deduplicated by post ID.

Upstreams:
  • Reddit listing API (reddit, default)
  • Microblog search API (microblog, needs FEEDVAULT_BEARER_TOKEN)

Examples:
  feedvault --sources rust,programming run    # Continuous polling
  feedvault --sources rust once               # Single cycle
  feedvault backfill rust                     # Historical strategies
  feedvault stats                             # Archive summary
")]
#[command(version)]
#[command(author = "FeedVault Contributors")]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the SQLite archive.
    #[arg(long, default_value = "feedvault.db", global = true)]
    pub db: PathBuf,

    /// Sources to track (subreddits or hashtags), comma-separated.
    #[arg(long, short, value_delimiter = ',', global = true)]
    pub sources: Vec<String>,

    /// Upstream to fetch from.
    #[arg(long, default_value = "reddit", global = true)]
    pub upstream: Upstream,

    /// Seconds between polling cycles.
    #[arg(long, short, default_value = "60", global = true)]
    pub interval: u64,

    /// Items per page (1-100).
    #[arg(long, default_value = "25", global = true)]
    pub page_size: u32,

    /// Max pages per source per polling cycle.
    #[arg(long, default_value = "1", global = true)]
    pub max_pages: u32,

    /// User agent sent with every request.
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Fixed delay between requests, in seconds.
    #[arg(long, default_value = "2", global = true)]
    pub rate_delay: u64,

    /// Switch to a windowed rate budget: requests allowed per window.
    #[arg(long, requires = "rate_window_secs", global = true)]
    pub rate_window_requests: Option<u32>,

    /// Window length in seconds for the windowed rate budget.
    #[arg(long, requires = "rate_window_requests", global = true)]
    pub rate_window_secs: Option<u64>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Poll sources continuously until interrupted.
    #[command(visible_alias = "r")]
    Run,

    /// Run exactly one polling cycle, then exit.
    #[command(visible_alias = "o")]
    Once,

    /// Walk the historical listing strategies for one source.
    #[command(visible_alias = "b")]
    Backfill(backfill::BackfillArgs),

    /// Show per-source archive statistics.
    #[command(visible_alias = "s")]
    Stats,
}

/// Supported upstream APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Upstream {
    /// Reddit listing API.
    #[default]
    Reddit,
    /// Microblog search API.
    Microblog,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error (bad configuration, startup failure).
    Error = 1,
    /// The command finished but some sources failed.
    SourceFailures = 2,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return; // No logging in quiet mode
    }

    let filter = if verbose {
        EnvFilter::new("feedvault=debug,info")
    } else {
        EnvFilter::new("feedvault=info,warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Run => run::run(&cli).await,
        Commands::Once => once::run(&cli).await,
        Commands::Backfill(args) => backfill::run(args, &cli).await,
        Commands::Stats => stats::run(&cli),
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e}");
            }
            ExitCode::Error
        }
    };

    std::process::exit(code as i32);
}
